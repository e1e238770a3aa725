//! Blog posts: public reads, role-gated writes.
//!
//! Published posts are world-readable. An unpublished post is only served to
//! its author or to editors and admins; everyone else sees the same 404 as
//! for a slug that never existed, so drafts do not leak their presence.

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

use super::auth::{
    AuthState,
    principal::{Role, maybe_session, require_role, require_session},
    storage::{current_role, is_unique_violation},
};
use super::OkResponse;

#[derive(Debug, Serialize, ToSchema)]
pub struct PostResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub created_at: String,
    pub updated_at: String,
    pub author_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
}

struct PostRecord {
    id: i64,
    slug: String,
    title: String,
    content: String,
    published: bool,
    created_at: String,
    updated_at: String,
    author_id: i64,
    author_name: String,
}

impl From<PostRecord> for PostResponse {
    fn from(record: PostRecord) -> Self {
        Self {
            id: record.id,
            slug: record.slug,
            title: record.title,
            content: record.content,
            published: record.published,
            created_at: record.created_at,
            updated_at: record.updated_at,
            author_name: record.author_name,
        }
    }
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> PostRecord {
    let published: i64 = row.get("published");
    PostRecord {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        content: row.get("content"),
        published: published != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
    }
}

const POST_COLUMNS: &str = "p.id, p.slug, p.title, p.content, p.published, \
                            p.created_at, p.updated_at, p.author_id, u.name AS author_name";

async fn published_posts(pool: &SqlitePool) -> Result<Vec<PostRecord>> {
    let query = format!(
        "SELECT {POST_COLUMNS} FROM posts p JOIN users u ON u.id = p.author_id \
         WHERE p.published = 1 ORDER BY p.created_at DESC, p.id DESC"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list posts")?;
    Ok(rows.iter().map(record_from_row).collect())
}

async fn post_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<PostRecord>> {
    let query = format!(
        "SELECT {POST_COLUMNS} FROM posts p JOIN users u ON u.id = p.author_id WHERE p.slug = ?"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(slug)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch post")?;
    Ok(row.as_ref().map(record_from_row))
}

enum InsertOutcome {
    Created,
    SlugTaken,
}

async fn insert_post(
    pool: &SqlitePool,
    slug: &str,
    title: &str,
    content: &str,
    published: bool,
    author_id: i64,
) -> Result<InsertOutcome> {
    let query =
        "INSERT INTO posts (slug, title, content, published, author_id) VALUES (?, ?, ?, ?, ?)";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(slug)
        .bind(title)
        .bind(content)
        .bind(i64::from(published))
        .bind(author_id)
        .execute(pool)
        .instrument(span)
        .await;

    match result {
        Ok(_) => Ok(InsertOutcome::Created),
        Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::SlugTaken),
        Err(err) => Err(err).context("failed to insert post"),
    }
}

async fn update_post_row(
    pool: &SqlitePool,
    slug: &str,
    changes: &UpdatePostRequest,
) -> Result<bool> {
    let query = "UPDATE posts SET \
                 title = COALESCE(?, title), \
                 content = COALESCE(?, content), \
                 published = COALESCE(?, published), \
                 updated_at = CURRENT_TIMESTAMP \
                 WHERE slug = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(&changes.title)
        .bind(&changes.content)
        .bind(changes.published.map(i64::from))
        .bind(slug)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update post")?;
    Ok(result.rows_affected() > 0)
}

async fn delete_post_row(pool: &SqlitePool, slug: &str) -> Result<()> {
    let query = "DELETE FROM posts WHERE slug = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(slug)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete post")?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/posts",
    responses(
        (status = 200, description = "Published posts, newest first", body = [PostResponse])
    ),
    tag = "posts"
)]
pub async fn list_posts(
    pool: Extension<SqlitePool>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let posts = published_posts(&pool)
        .await?
        .into_iter()
        .map(PostResponse::from)
        .collect();
    Ok(Json(posts))
}

#[utoipa::path(
    get,
    path = "/api/posts/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "The post", body = PostResponse),
        (status = 404, description = "Unknown slug, or a draft the caller may not see")
    ),
    tag = "posts"
)]
pub async fn get_post(
    headers: HeaderMap,
    Path(slug): Path<String>,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<PostResponse>, ApiError> {
    let Some(record) = post_by_slug(&pool, &slug).await? else {
        return Err(ApiError::NotFound);
    };

    if !record.published {
        let visible = match maybe_session(&headers, &auth_state) {
            Some(principal) if principal.user_id == record.author_id => true,
            Some(principal) => current_role(&pool, principal.user_id)
                .await?
                .is_some_and(|role| role >= Role::Editor),
            None => false,
        };
        if !visible {
            return Err(ApiError::NotFound);
        }
    }

    Ok(Json(record.into()))
}

#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 200, description = "Post created", body = OkResponse),
        (status = 400, description = "Slug or title missing"),
        (status = 403, description = "Caller is below editor"),
        (status = 409, description = "Slug already exists")
    ),
    tag = "posts"
)]
pub async fn create_post(
    headers: HeaderMap,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<CreatePostRequest>>,
) -> Result<Json<OkResponse>, ApiError> {
    let principal = require_session(&headers, &auth_state)?;
    require_role(&pool, &principal, Role::Editor).await?;

    let Some(Json(request)) = payload else {
        return Err(ApiError::MissingFields);
    };
    let (Some(slug), Some(title)) = (request.slug, request.title) else {
        return Err(ApiError::MissingFields);
    };
    if slug.is_empty() || title.is_empty() {
        return Err(ApiError::MissingFields);
    }

    let content = request.content.unwrap_or_default();
    let published = request.published.unwrap_or(true);
    match insert_post(&pool, &slug, &title, &content, published, principal.user_id).await? {
        InsertOutcome::Created => Ok(Json(OkResponse { ok: true })),
        InsertOutcome::SlugTaken => Err(ApiError::Conflict),
    }
}

#[utoipa::path(
    put,
    path = "/api/posts/{slug}",
    request_body = UpdatePostRequest,
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post updated", body = OkResponse),
        (status = 403, description = "Caller is below editor"),
        (status = 404, description = "Unknown slug")
    ),
    tag = "posts"
)]
pub async fn update_post(
    headers: HeaderMap,
    Path(slug): Path<String>,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<UpdatePostRequest>>,
) -> Result<Json<OkResponse>, ApiError> {
    let principal = require_session(&headers, &auth_state)?;
    require_role(&pool, &principal, Role::Editor).await?;

    let changes = match payload {
        Some(Json(request)) => request,
        None => UpdatePostRequest {
            title: None,
            content: None,
            published: None,
        },
    };

    if !update_post_row(&pool, &slug, &changes).await? {
        return Err(ApiError::NotFound);
    }
    Ok(Json(OkResponse { ok: true }))
}

#[utoipa::path(
    delete,
    path = "/api/posts/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Acknowledged whether or not the slug existed", body = OkResponse),
        (status = 403, description = "Caller is not an admin")
    ),
    tag = "posts"
)]
pub async fn delete_post(
    headers: HeaderMap,
    Path(slug): Path<String>,
    pool: Extension<SqlitePool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<OkResponse>, ApiError> {
    let principal = require_session(&headers, &auth_state)?;
    require_role(&pool, &principal, Role::Admin).await?;

    // Deleting an absent slug is not an error; the end state is the same.
    delete_post_row(&pool, &slug).await?;
    Ok(Json(OkResponse { ok: true }))
}
