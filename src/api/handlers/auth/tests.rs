//! Auth module tests.

use super::principal::{Role, require_role, require_session};
use super::storage::{RegisterOutcome, insert_user, set_role};
use super::types::{LoginRequest, RegisterRequest};
use super::{AuthConfig, AuthState, login, logout, me, register};
use anyhow::{Context, Result, anyhow};
use axum::body::to_bytes;
use axum::extract::Extension;
use axum::http::{
    HeaderMap, StatusCode,
    header::{COOKIE, SET_COOKIE},
};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::db;

// Minimum bcrypt cost keeps the tests fast.
fn auth_state() -> Arc<AuthState> {
    let config = AuthConfig::new("test-secret".to_string()).with_bcrypt_cost(4);
    Arc::new(AuthState::new(config))
}

async fn pool() -> Result<SqlitePool> {
    db::memory_pool().await
}

fn register_request(name: Option<&str>, email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        name: name.map(ToString::to_string),
        email: email.to_string(),
        password: password.to_string(),
    }
}

async fn body_json(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .context("failed to read body")?;
    serde_json::from_slice(&bytes).context("body is not json")
}

/// Turn the Set-Cookie from a register/login response into a Cookie header
/// for a follow-up request.
fn cookie_headers(response: &Response) -> Result<HeaderMap> {
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .ok_or_else(|| anyhow!("no session cookie set"))?;
    let pair = set_cookie
        .to_str()
        .context("cookie not ascii")?
        .split(';')
        .next()
        .ok_or_else(|| anyhow!("empty cookie"))?
        .to_string();
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, pair.parse().context("cookie pair not a header")?);
    Ok(headers)
}

#[tokio::test]
async fn register_sets_session_and_returns_identity() -> Result<()> {
    let pool = pool().await?;
    let state = auth_state();

    let response = register(
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(axum::Json(register_request(
            Some("Alice"),
            "alice@example.com",
            "s3cret",
        ))),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = cookie_headers(&response)?;
    let body = body_json(response).await?;
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["email"], "alice@example.com");

    let principal = require_session(&headers, &state).map_err(|_| anyhow!("session rejected"))?;
    assert_eq!(principal.email, "alice@example.com");
    Ok(())
}

#[tokio::test]
async fn register_without_name_stores_an_empty_one() -> Result<()> {
    let pool = pool().await?;
    let response = register(
        Extension(pool),
        Extension(auth_state()),
        Some(axum::Json(register_request(None, "bob@example.com", "pw"))),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["name"], "");
    Ok(())
}

#[tokio::test]
async fn register_duplicate_email_conflicts() -> Result<()> {
    let pool = pool().await?;
    let state = auth_state();

    let first = register(
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(axum::Json(register_request(None, "dup@example.com", "pw"))),
    )
    .await
    .into_response();
    assert_eq!(first.status(), StatusCode::OK);

    let second = register(
        Extension(pool),
        Extension(state),
        Some(axum::Json(register_request(None, "dup@example.com", "pw2"))),
    )
    .await
    .into_response();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = body_json(second).await?;
    assert_eq!(body["error"], "email_taken");
    Ok(())
}

#[tokio::test]
async fn register_rejects_bad_email_and_empty_password() -> Result<()> {
    let pool = pool().await?;
    let state = auth_state();

    let bad_email = register(
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(axum::Json(register_request(None, "not-an-email", "pw"))),
    )
    .await
    .into_response();
    assert_eq!(bad_email.status(), StatusCode::BAD_REQUEST);

    let no_password = register(
        Extension(pool),
        Extension(state),
        Some(axum::Json(register_request(None, "ok@example.com", ""))),
    )
    .await
    .into_response();
    assert_eq!(no_password.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn login_failures_are_indistinguishable() -> Result<()> {
    let pool = pool().await?;
    let state = auth_state();

    register(
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(axum::Json(register_request(None, "eve@example.com", "right"))),
    )
    .await
    .into_response();

    let wrong_password = login(
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(axum::Json(LoginRequest {
            email: "eve@example.com".to_string(),
            password: "wrong".to_string(),
        })),
    )
    .await
    .into_response();

    let unknown_email = login(
        Extension(pool),
        Extension(state),
        Some(axum::Json(LoginRequest {
            email: "ghost@example.com".to_string(),
            password: "whatever".to_string(),
        })),
    )
    .await
    .into_response();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(wrong_password).await?,
        body_json(unknown_email).await?
    );
    Ok(())
}

#[tokio::test]
async fn login_round_trips_to_profile() -> Result<()> {
    let pool = pool().await?;
    let state = auth_state();

    register(
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(axum::Json(register_request(
            Some("Carol"),
            "carol@example.com",
            "pw",
        ))),
    )
    .await
    .into_response();

    let response = login(
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(axum::Json(LoginRequest {
            email: "carol@example.com".to_string(),
            password: "pw".to_string(),
        })),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = cookie_headers(&response)?;
    let profile = me(headers, Extension(pool), Extension(state))
        .await
        .map_err(|_| anyhow!("me rejected"))?;
    assert_eq!(profile.role, "user");
    assert_eq!(profile.email, "carol@example.com");
    Ok(())
}

#[tokio::test]
async fn logout_expires_the_cookie() -> Result<()> {
    let response = logout(Extension(auth_state())).await.into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .ok_or_else(|| anyhow!("no cookie"))?;
    assert!(set_cookie.to_str()?.contains("Max-Age=0"));
    Ok(())
}

#[tokio::test]
async fn role_change_applies_on_next_check() -> Result<()> {
    let pool = pool().await?;
    let state = auth_state();

    let response = register(
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(axum::Json(register_request(None, "dana@example.com", "pw"))),
    )
    .await
    .into_response();
    let headers = cookie_headers(&response)?;
    let principal = require_session(&headers, &state).map_err(|_| anyhow!("session rejected"))?;

    assert!(require_role(&pool, &principal, Role::Editor).await.is_err());

    // Promote without reissuing the token; the same session now clears
    // the editor gate.
    assert!(set_role(&pool, principal.user_id, Role::Editor).await?);
    let role = require_role(&pool, &principal, Role::Editor)
        .await
        .map_err(|_| anyhow!("gate rejected after promotion"))?;
    assert_eq!(role, Role::Editor);
    Ok(())
}

#[tokio::test]
async fn concurrent_duplicate_registration_yields_one_row() -> Result<()> {
    let pool = pool().await?;

    let (a, b) = tokio::join!(
        insert_user(&pool, "x", "race@example.com", "hash-a"),
        insert_user(&pool, "x", "race@example.com", "hash-b"),
    );
    let outcomes = [a?, b?];
    let created = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, RegisterOutcome::Created(_)))
        .count();
    assert_eq!(created, 1);
    Ok(())
}
