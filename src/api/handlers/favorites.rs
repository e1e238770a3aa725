//! Per-user favorite document paths.
//!
//! Adding and removing are both idempotent: favoriting a path twice keeps a
//! single row, and removing an absent favorite still acknowledges.

use anyhow::{Context, Result};
use axum::{
    Json,
    extract::Extension,
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tracing::Instrument;
use utoipa::ToSchema;

use crate::api::error::ApiError;

use super::OkResponse;
use super::auth::{AuthState, principal::require_session};

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteResponse {
    pub id: i64,
    pub path: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FavoriteRequest {
    pub path: Option<String>,
}

async fn favorites_for(pool: &SqlitePool, user_id: i64) -> Result<Vec<FavoriteResponse>> {
    let query = "SELECT id, path, created_at FROM favorites WHERE user_id = ? \
                 ORDER BY created_at DESC, id DESC";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list favorites")?;

    Ok(rows
        .into_iter()
        .map(|row| FavoriteResponse {
            id: row.get("id"),
            path: row.get("path"),
            created_at: row.get("created_at"),
        })
        .collect())
}

async fn add_favorite_row(pool: &SqlitePool, user_id: i64, path: &str) -> Result<()> {
    let query = "INSERT INTO favorites (user_id, path) VALUES (?, ?) \
                 ON CONFLICT (user_id, path) DO NOTHING";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(path)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to add favorite")?;
    Ok(())
}

async fn remove_favorite_row(pool: &SqlitePool, user_id: i64, path: &str) -> Result<()> {
    let query = "DELETE FROM favorites WHERE user_id = ? AND path = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(path)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to remove favorite")?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/favorites",
    responses(
        (status = 200, description = "Caller's favorites, newest first", body = [FavoriteResponse]),
        (status = 401, description = "No valid session")
    ),
    tag = "favorites"
)]
pub async fn list_favorites(
    headers: HeaderMap,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<Vec<FavoriteResponse>>, ApiError> {
    let principal = require_session(&headers, &auth_state)?;
    Ok(Json(favorites_for(&pool, principal.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/favorites",
    request_body = FavoriteRequest,
    responses(
        (status = 200, description = "Favorite recorded (no-op when already present)", body = OkResponse),
        (status = 400, description = "Missing path"),
        (status = 401, description = "No valid session")
    ),
    tag = "favorites"
)]
pub async fn add_favorite(
    headers: HeaderMap,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<FavoriteRequest>>,
) -> Result<Json<OkResponse>, ApiError> {
    let principal = require_session(&headers, &auth_state)?;
    let path = match payload {
        Some(Json(FavoriteRequest { path: Some(path) })) if !path.is_empty() => path,
        _ => return Err(ApiError::MissingPath),
    };

    add_favorite_row(&pool, principal.user_id, &path).await?;
    Ok(Json(OkResponse { ok: true }))
}

#[utoipa::path(
    delete,
    path = "/api/favorites",
    request_body = FavoriteRequest,
    responses(
        (status = 200, description = "Favorite removed (no-op when absent)", body = OkResponse),
        (status = 400, description = "Missing path"),
        (status = 401, description = "No valid session")
    ),
    tag = "favorites"
)]
pub async fn remove_favorite(
    headers: HeaderMap,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<FavoriteRequest>>,
) -> Result<Json<OkResponse>, ApiError> {
    let principal = require_session(&headers, &auth_state)?;
    let path = match payload {
        Some(Json(FavoriteRequest { path: Some(path) })) if !path.is_empty() => path,
        _ => return Err(ApiError::MissingPath),
    };

    remove_favorite_row(&pool, principal.user_id, &path).await?;
    Ok(Json(OkResponse { ok: true }))
}
