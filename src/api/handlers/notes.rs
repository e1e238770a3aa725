//! Personal notes attached to document paths.
//!
//! One note per (user, path); writes upsert, so saving twice never grows the
//! table. Reading a path without a note returns an empty note rather than a
//! 404 so the client can render an editor unconditionally.

use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Extension, Path},
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
pub struct NoteResponse {
    pub path: String,
    pub content: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PutNoteRequest {
    pub content: Option<String>,
}

async fn notes_for(pool: &SqlitePool, user_id: i64) -> Result<Vec<NoteResponse>> {
    let query = "SELECT path, content, updated_at FROM notes WHERE user_id = ?";
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
        .context("failed to list notes")?;

    Ok(rows
        .into_iter()
        .map(|row| NoteResponse {
            path: row.get("path"),
            content: row.get("content"),
            updated_at: Some(row.get("updated_at")),
        })
        .collect())
}

async fn note_for(pool: &SqlitePool, user_id: i64, path: &str) -> Result<Option<NoteResponse>> {
    let query = "SELECT path, content, updated_at FROM notes WHERE user_id = ? AND path = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(path)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch note")?;

    Ok(row.map(|row| NoteResponse {
        path: row.get("path"),
        content: row.get("content"),
        updated_at: Some(row.get("updated_at")),
    }))
}

async fn upsert_note(pool: &SqlitePool, user_id: i64, path: &str, content: &str) -> Result<()> {
    let query = "INSERT INTO notes (user_id, path, content) VALUES (?, ?, ?) \
                 ON CONFLICT (user_id, path) DO UPDATE SET \
                 content = excluded.content, updated_at = CURRENT_TIMESTAMP";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(path)
        .bind(content)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to upsert note")?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/notes",
    responses(
        (status = 200, description = "All of the caller's notes", body = [NoteResponse]),
        (status = 401, description = "No valid session")
    ),
    tag = "notes"
)]
pub async fn list_notes(
    headers: HeaderMap,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<Vec<NoteResponse>>, ApiError> {
    let principal = require_session(&headers, &auth_state)?;
    Ok(Json(notes_for(&pool, principal.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/notes/{path}",
    params(("path" = String, Path, description = "Document path the note is attached to")),
    responses(
        (status = 200, description = "The note, or an empty one when never saved", body = NoteResponse),
        (status = 401, description = "No valid session")
    ),
    tag = "notes"
)]
pub async fn get_note(
    headers: HeaderMap,
    Path(path): Path<String>,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<NoteResponse>, ApiError> {
    let principal = require_session(&headers, &auth_state)?;
    let note = note_for(&pool, principal.user_id, &path)
        .await?
        .unwrap_or(NoteResponse {
            path,
            content: String::new(),
            updated_at: None,
        });
    Ok(Json(note))
}

#[utoipa::path(
    put,
    path = "/api/notes/{path}",
    request_body = PutNoteRequest,
    params(("path" = String, Path, description = "Document path the note is attached to")),
    responses(
        (status = 200, description = "Note saved", body = OkResponse),
        (status = 401, description = "No valid session")
    ),
    tag = "notes"
)]
pub async fn put_note(
    headers: HeaderMap,
    Path(path): Path<String>,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<PutNoteRequest>>,
) -> Result<Json<OkResponse>, ApiError> {
    let principal = require_session(&headers, &auth_state)?;
    // An absent body clears the note; the row stays so updated_at records
    // when the clearing happened.
    let content = payload
        .and_then(|Json(request)| request.content)
        .unwrap_or_default();

    upsert_note(&pool, principal.user_id, &path, &content).await?;
    Ok(Json(OkResponse { ok: true }))
}
