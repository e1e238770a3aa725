//! Profile self-service and administrative user management.

use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::error::ApiError;

use super::auth::{
    AuthState, password,
    principal::{Role, require_role, require_session},
    session::session_cookie,
    storage::{self, ProfileChanges, UpdateOutcome},
    token::{self, SessionRejection},
    types::MeResponse,
};
use super::{OkResponse, valid_email};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub description: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummaryResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    pub role: String,
}

#[utoipa::path(
    put,
    path = "/api/user",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile; cookie refreshed when the email changed", body = MeResponse),
        (status = 400, description = "Invalid email format"),
        (status = 401, description = "No valid session"),
        (status = 409, description = "Email already in use")
    ),
    tag = "users"
)]
pub async fn update_profile(
    headers: HeaderMap,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<UpdateProfileRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_session(&headers, &auth_state)?;
    let Some(Json(request)) = payload else {
        return Err(ApiError::MissingFields);
    };

    let email = match request.email {
        Some(email) => {
            let email = email.trim().to_string();
            if !valid_email(&email) {
                return Err(ApiError::InvalidInput("invalid email"));
            }
            Some(email)
        }
        None => None,
    };

    let config = auth_state.config();
    let password_hash = match request.password {
        Some(password) if !password.is_empty() => {
            Some(password::hash_password(&password, config.bcrypt_cost())?)
        }
        _ => None,
    };

    let changes = ProfileChanges {
        name: request.name,
        email: email.clone(),
        avatar_url: request.avatar_url,
        bio: request.bio,
        description: request.description,
        password_hash,
    };

    match storage::update_profile(&pool, principal.user_id, &changes).await? {
        UpdateOutcome::Updated => {}
        UpdateOutcome::EmailTaken => return Err(ApiError::EmailTaken),
    }

    let Some(profile) = storage::fetch_profile(&pool, principal.user_id).await? else {
        return Err(ApiError::Unauthorized(SessionRejection::Invalid));
    };

    // The session token embeds the email, so a changed address needs a
    // fresh cookie or the old claims would linger for a week.
    let mut response_headers = HeaderMap::new();
    if email.is_some_and(|email| email != principal.email) {
        let refreshed = token::issue(
            profile.id,
            &profile.email,
            config.session_secret(),
            config.session_ttl_seconds(),
        )?;
        let cookie = session_cookie(config, &refreshed)
            .context("failed to build session cookie header")?;
        response_headers.insert(SET_COOKIE, cookie);
    }

    Ok((
        StatusCode::OK,
        response_headers,
        Json(MeResponse {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            role: profile.role,
            avatar_url: profile.avatar_url,
            bio: profile.bio,
            description: profile.description,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All accounts, newest first", body = [UserSummaryResponse]),
        (status = 401, description = "No valid session"),
        (status = 403, description = "Caller is not an admin")
    ),
    tag = "admin"
)]
pub async fn list_users(
    headers: HeaderMap,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<Vec<UserSummaryResponse>>, ApiError> {
    let principal = require_session(&headers, &auth_state)?;
    require_role(&pool, &principal, Role::Admin).await?;

    let users = storage::list_users(&pool)
        .await?
        .into_iter()
        .map(|user| UserSummaryResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        })
        .collect();
    Ok(Json(users))
}

#[utoipa::path(
    put,
    path = "/api/admin/role/{user_id}",
    request_body = SetRoleRequest,
    params(
        ("user_id" = i64, Path, description = "Account whose role changes")
    ),
    responses(
        (status = 200, description = "Role updated", body = OkResponse),
        (status = 400, description = "Role outside the fixed set"),
        (status = 403, description = "Caller is not an admin, or targets their own role"),
        (status = 404, description = "No such account")
    ),
    tag = "admin"
)]
pub async fn set_role(
    headers: HeaderMap,
    Path(user_id): Path<i64>,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SetRoleRequest>>,
) -> Result<Json<OkResponse>, ApiError> {
    let principal = require_session(&headers, &auth_state)?;
    require_role(&pool, &principal, Role::Admin).await?;

    let Some(Json(request)) = payload else {
        return Err(ApiError::MissingFields);
    };
    let Some(role) = Role::parse(&request.role) else {
        return Err(ApiError::InvalidRole);
    };

    // Admins cannot change their own role; demoting the last admin would
    // lock the instance out of administration.
    if user_id == principal.user_id {
        return Err(ApiError::Forbidden);
    }

    if !storage::set_role(&pool, user_id, role).await? {
        return Err(ApiError::NotFound);
    }
    Ok(Json(OkResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::AuthConfig;
    use crate::api::handlers::auth::storage::{RegisterOutcome, insert_user};
    use crate::db;
    use anyhow::{Result, anyhow};
    use axum::http::header::COOKIE;

    fn auth_state() -> Arc<AuthState> {
        Arc::new(AuthState::new(
            AuthConfig::new("test-secret".to_string()).with_bcrypt_cost(4),
        ))
    }

    async fn seeded_user(pool: &SqlitePool, email: &str, role: Role) -> Result<i64> {
        let id = match insert_user(pool, "test", email, "hash").await? {
            RegisterOutcome::Created(id) => id,
            RegisterOutcome::EmailTaken => return Err(anyhow!("seed collision")),
        };
        crate::api::handlers::auth::storage::set_role(pool, id, role).await?;
        Ok(id)
    }

    fn session_headers(state: &AuthState, user_id: i64, email: &str) -> Result<HeaderMap> {
        let config = state.config();
        let token = token::issue(
            user_id,
            email,
            config.session_secret(),
            config.session_ttl_seconds(),
        )?;
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            format!("docshelf_session={token}").parse()?,
        );
        Ok(headers)
    }

    #[tokio::test]
    async fn admin_listing_requires_admin_role() -> Result<()> {
        let pool = db::memory_pool().await?;
        let state = auth_state();
        let id = seeded_user(&pool, "user@example.com", Role::User).await?;
        let headers = session_headers(&state, id, "user@example.com")?;

        let result = list_users(headers, Extension(pool), Extension(state)).await;
        assert!(matches!(result, Err(ApiError::Forbidden)));
        Ok(())
    }

    #[tokio::test]
    async fn admin_cannot_change_own_role() -> Result<()> {
        let pool = db::memory_pool().await?;
        let state = auth_state();
        let id = seeded_user(&pool, "admin@example.com", Role::Admin).await?;
        let headers = session_headers(&state, id, "admin@example.com")?;

        let result = set_role(
            headers,
            Path(id),
            Extension(pool),
            Extension(state),
            Some(Json(SetRoleRequest {
                role: "user".to_string(),
            })),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Forbidden)));
        Ok(())
    }

    #[tokio::test]
    async fn set_role_rejects_unknown_role_and_unknown_user() -> Result<()> {
        let pool = db::memory_pool().await?;
        let state = auth_state();
        let admin = seeded_user(&pool, "admin@example.com", Role::Admin).await?;
        let headers = session_headers(&state, admin, "admin@example.com")?;

        let bad_role = set_role(
            headers.clone(),
            Path(admin + 1),
            Extension(pool.clone()),
            Extension(state.clone()),
            Some(Json(SetRoleRequest {
                role: "root".to_string(),
            })),
        )
        .await;
        assert!(matches!(bad_role, Err(ApiError::InvalidRole)));

        let missing = set_role(
            headers,
            Path(admin + 999),
            Extension(pool),
            Extension(state),
            Some(Json(SetRoleRequest {
                role: "editor".to_string(),
            })),
        )
        .await;
        assert!(matches!(missing, Err(ApiError::NotFound)));
        Ok(())
    }

    #[tokio::test]
    async fn update_profile_coalesces_and_rejects_taken_email() -> Result<()> {
        let pool = db::memory_pool().await?;
        let state = auth_state();
        let alice = seeded_user(&pool, "alice@example.com", Role::User).await?;
        seeded_user(&pool, "bob@example.com", Role::User).await?;
        let headers = session_headers(&state, alice, "alice@example.com")?;

        let taken = update_profile(
            headers.clone(),
            Extension(pool.clone()),
            Extension(state.clone()),
            Some(Json(UpdateProfileRequest {
                name: None,
                email: Some("bob@example.com".to_string()),
                avatar_url: None,
                bio: None,
                description: None,
                password: None,
            })),
        )
        .await;
        assert!(matches!(taken, Err(ApiError::EmailTaken)));

        let response = update_profile(
            headers,
            Extension(pool.clone()),
            Extension(state),
            Some(Json(UpdateProfileRequest {
                name: None,
                email: None,
                avatar_url: None,
                bio: Some("writes docs".to_string()),
                description: None,
                password: None,
            })),
        )
        .await
        .map_err(|_| anyhow!("update rejected"))?
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let profile = storage::fetch_profile(&pool, alice)
            .await?
            .ok_or_else(|| anyhow!("profile gone"))?;
        assert_eq!(profile.name, "test");
        assert_eq!(profile.bio, "writes docs");
        Ok(())
    }

    #[tokio::test]
    async fn email_change_reissues_the_cookie() -> Result<()> {
        let pool = db::memory_pool().await?;
        let state = auth_state();
        let alice = seeded_user(&pool, "alice@example.com", Role::User).await?;
        let headers = session_headers(&state, alice, "alice@example.com")?;

        let response = update_profile(
            headers,
            Extension(pool),
            Extension(state),
            Some(Json(UpdateProfileRequest {
                name: None,
                email: Some("alice@new.example.com".to_string()),
                avatar_url: None,
                bio: None,
                description: None,
                password: None,
            })),
        )
        .await
        .map_err(|_| anyhow!("update rejected"))?
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(SET_COOKIE));
        Ok(())
    }
}
