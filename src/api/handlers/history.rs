//! Per-user visit history, append-only with a capped read.

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

const HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntryResponse {
    pub path: String,
    pub visited_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VisitRequest {
    pub path: Option<String>,
}

async fn recent_history(pool: &SqlitePool, user_id: i64) -> Result<Vec<HistoryEntryResponse>> {
    // id breaks ties between visits recorded in the same second.
    let query = "SELECT path, visited_at FROM history WHERE user_id = ? \
                 ORDER BY visited_at DESC, id DESC LIMIT ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(user_id)
        .bind(HISTORY_LIMIT)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list history")?;

    Ok(rows
        .into_iter()
        .map(|row| HistoryEntryResponse {
            path: row.get("path"),
            visited_at: row.get("visited_at"),
        })
        .collect())
}

async fn append_visit(pool: &SqlitePool, user_id: i64, path: &str) -> Result<()> {
    let query = "INSERT INTO history (user_id, path) VALUES (?, ?)";
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
        .context("failed to append visit")?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/history",
    responses(
        (status = 200, description = "Up to 50 most recent visits, newest first", body = [HistoryEntryResponse]),
        (status = 401, description = "No valid session")
    ),
    tag = "history"
)]
pub async fn list_history(
    headers: HeaderMap,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    let principal = require_session(&headers, &auth_state)?;
    Ok(Json(recent_history(&pool, principal.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/history",
    request_body = VisitRequest,
    responses(
        (status = 200, description = "Visit recorded", body = OkResponse),
        (status = 400, description = "Missing path"),
        (status = 401, description = "No valid session")
    ),
    tag = "history"
)]
pub async fn record_visit(
    headers: HeaderMap,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VisitRequest>>,
) -> Result<Json<OkResponse>, ApiError> {
    let principal = require_session(&headers, &auth_state)?;
    let path = match payload {
        Some(Json(VisitRequest { path: Some(path) })) if !path.is_empty() => path,
        _ => return Err(ApiError::MissingPath),
    };

    append_visit(&pool, principal.user_id, &path).await?;
    Ok(Json(OkResponse { ok: true }))
}
