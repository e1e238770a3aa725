//! Credential store: SQL for user rows.
//!
//! Password hashes stay inside this module's record types and are never
//! serialized into a response. Email uniqueness is enforced by the store
//! constraint; the pre-checks here exist only to produce precise errors
//! and lose no safety under races.

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};
use tracing::Instrument;

use super::principal::Role;

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub(crate) enum RegisterOutcome {
    Created(i64),
    EmailTaken,
}

/// Outcome of a partial profile update.
#[derive(Debug)]
pub(crate) enum UpdateOutcome {
    Updated,
    EmailTaken,
}

/// Fields needed to verify a login attempt.
pub(crate) struct CredentialRecord {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) password_hash: String,
}

/// Client-visible profile, without the hash.
#[derive(Debug)]
pub(crate) struct ProfileRecord {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) role: String,
    pub(crate) avatar_url: String,
    pub(crate) bio: String,
    pub(crate) description: String,
}

/// Row for the admin user listing.
#[derive(Debug)]
pub(crate) struct UserSummary {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) role: String,
    pub(crate) created_at: String,
}

/// Partial profile update; `None` fields keep their stored value.
#[derive(Debug, Default)]
pub(crate) struct ProfileChanges {
    pub(crate) name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) avatar_url: Option<String>,
    pub(crate) bio: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) password_hash: Option<String>,
}

pub(crate) async fn insert_user(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<RegisterOutcome> {
    let query = "INSERT INTO users (name, email, password_hash) VALUES (?, ?, ?) RETURNING id";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(RegisterOutcome::Created(row.get("id"))),
        Err(err) if is_unique_violation(&err) => Ok(RegisterOutcome::EmailTaken),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

pub(crate) async fn lookup_credentials(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<CredentialRecord>> {
    let query = "SELECT id, name, email, password_hash FROM users WHERE email = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup credentials")?;

    Ok(row.map(|row| CredentialRecord {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
    }))
}

pub(crate) async fn fetch_profile(pool: &SqlitePool, user_id: i64) -> Result<Option<ProfileRecord>> {
    let query = "SELECT id, name, email, role, avatar_url, bio, description FROM users WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch profile")?;

    Ok(row.map(|row| ProfileRecord {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role: row.get("role"),
        avatar_url: row.get("avatar_url"),
        bio: row.get("bio"),
        description: row.get("description"),
    }))
}

/// Apply a partial update with coalesce semantics: absent fields keep their
/// previous value. A changing email re-checks uniqueness excluding the
/// caller's own row; the store constraint still backstops races.
pub(crate) async fn update_profile(
    pool: &SqlitePool,
    user_id: i64,
    changes: &ProfileChanges,
) -> Result<UpdateOutcome> {
    if let Some(email) = &changes.email {
        let taken = sqlx::query("SELECT id FROM users WHERE email = ? AND id != ?")
            .bind(email)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .context("failed to check email uniqueness")?;
        if taken.is_some() {
            return Ok(UpdateOutcome::EmailTaken);
        }
    }

    let query = "UPDATE users SET \
                 name = COALESCE(?, name), \
                 email = COALESCE(?, email), \
                 avatar_url = COALESCE(?, avatar_url), \
                 bio = COALESCE(?, bio), \
                 description = COALESCE(?, description), \
                 password_hash = COALESCE(?, password_hash) \
                 WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.avatar_url)
        .bind(&changes.bio)
        .bind(&changes.description)
        .bind(&changes.password_hash)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await;

    match result {
        Ok(_) => Ok(UpdateOutcome::Updated),
        Err(err) if is_unique_violation(&err) => Ok(UpdateOutcome::EmailTaken),
        Err(err) => Err(err).context("failed to update profile"),
    }
}

/// Set a user's role. Returns whether a row was touched.
pub(crate) async fn set_role(pool: &SqlitePool, user_id: i64, role: Role) -> Result<bool> {
    let query = "UPDATE users SET role = ? WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(role.as_str())
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to set role")?;

    Ok(result.rows_affected() > 0)
}

/// Fresh role read for the authorization gate. `None` when the user row is
/// gone (stale session for a deleted account).
pub(crate) async fn current_role(pool: &SqlitePool, user_id: i64) -> Result<Option<Role>> {
    let query = "SELECT role FROM users WHERE id = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to read current role")?;

    let Some(row) = row else {
        return Ok(None);
    };
    let role: String = row.get("role");
    let role = Role::parse(&role)
        .with_context(|| format!("user {user_id} has a role outside the fixed set: {role}"))?;
    Ok(Some(role))
}

pub(crate) async fn list_users(pool: &SqlitePool) -> Result<Vec<UserSummary>> {
    let query =
        "SELECT id, name, email, role, created_at FROM users ORDER BY created_at DESC, id DESC";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list users")?;

    Ok(rows
        .into_iter()
        .map(|row| UserSummary {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            role: row.get("role"),
            created_at: row.get("created_at"),
        })
        .collect())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
