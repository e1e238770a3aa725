//! Session endpoints and supporting modules.
//!
//! This module coordinates account registration, password login, and the
//! stateless session cookie the rest of the API authenticates with.
//!
//! ## Sessions
//!
//! A session is a signed HS256 token carrying only the user id and email,
//! delivered in an `HttpOnly` cookie. Role is never encoded in the token:
//! every role-gated endpoint re-reads it from the credential store, so
//! promotions and demotions apply on the target's next request.

pub(crate) mod password;
pub(crate) mod principal;
pub(crate) mod session;
mod state;
pub(crate) mod storage;
pub(crate) mod token;
pub(crate) mod types;

pub use state::{AuthConfig, AuthState};

use anyhow::Context;
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::api::error::ApiError;

use self::session::{clear_session_cookie, session_cookie};
use self::storage::{RegisterOutcome, fetch_profile, insert_user, lookup_credentials};
use self::token::SessionRejection;
use self::types::{IdentityResponse, LoginRequest, MeResponse, RegisterRequest};
use super::{OkResponse, valid_email};

fn session_headers(auth_state: &AuthState, token: &str) -> Result<HeaderMap, ApiError> {
    let cookie = session_cookie(auth_state.config(), token)
        .context("failed to build session cookie header")?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    Ok(headers)
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created, session cookie set", body = IdentityResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Email already registered")
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::MissingFields);
    };

    let email = request.email.trim().to_string();
    if !valid_email(&email) {
        return Err(ApiError::InvalidInput("invalid email"));
    }
    if request.password.is_empty() {
        return Err(ApiError::MissingFields);
    }

    let name = request.name.map(|name| name.trim().to_string()).unwrap_or_default();

    let config = auth_state.config();
    let password_hash = password::hash_password(&request.password, config.bcrypt_cost())?;

    let user_id = match insert_user(&pool, &name, &email, &password_hash).await? {
        RegisterOutcome::Created(id) => id,
        RegisterOutcome::EmailTaken => return Err(ApiError::EmailTaken),
    };

    let token = token::issue(
        user_id,
        &email,
        config.session_secret(),
        config.session_ttl_seconds(),
    )?;
    let headers = session_headers(&auth_state, &token)?;

    Ok((
        StatusCode::OK,
        headers,
        Json(IdentityResponse {
            id: user_id,
            name,
            email,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session cookie set", body = IdentityResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Unknown email or wrong password")
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::MissingFields);
    };

    let email = request.email.trim().to_string();
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::MissingFields);
    }

    // Unknown email and wrong password produce the same response so the
    // endpoint does not leak which accounts exist.
    let Some(record) = lookup_credentials(&pool, &email).await? else {
        return Err(ApiError::InvalidCredentials);
    };
    if !password::verify_password(&request.password, &record.password_hash)? {
        return Err(ApiError::InvalidCredentials);
    }

    let config = auth_state.config();
    let token = token::issue(
        record.id,
        &record.email,
        config.session_secret(),
        config.session_ttl_seconds(),
    )?;
    let headers = session_headers(&auth_state, &token)?;

    Ok((
        StatusCode::OK,
        headers,
        Json(IdentityResponse {
            id: record.id,
            name: record.name,
            email: record.email,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = OkResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    let cookie = clear_session_cookie(auth_state.config())
        .context("failed to build clearing cookie header")?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    Ok((StatusCode::OK, headers, Json(OkResponse { ok: true })))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user's profile", body = MeResponse),
        (status = 401, description = "No valid session")
    ),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<MeResponse>, ApiError> {
    let principal = principal::require_session(&headers, &auth_state)?;

    // A token can outlive its account row; treat that as a dead session.
    let Some(profile) = fetch_profile(&pool, principal.user_id).await? else {
        return Err(ApiError::Unauthorized(SessionRejection::Invalid));
    };

    Ok(Json(MeResponse {
        id: profile.id,
        name: profile.name,
        email: profile.email,
        role: profile.role,
        avatar_url: profile.avatar_url,
        bio: profile.bio,
        description: profile.description,
    }))
}

#[cfg(test)]
mod tests;
