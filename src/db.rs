//! Database pool setup, schema application and the bootstrap admin seed.

use anyhow::{Context, Result};
use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, time::Duration};
use tracing::info;

const SCHEMA_SQL: &str = include_str!("../sql/schema.sql");

/// Open the connection pool.
///
/// Foreign keys are enabled per-connection; cascading deletes and the
/// `author_id`/`user_id` references depend on it.
///
/// # Errors
/// Returns an error if the DSN is invalid or the database cannot be opened.
pub async fn connect(dsn: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(dsn)
        .with_context(|| format!("Invalid database DSN: {dsn}"))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect_with(options)
        .await
        .context("Failed to connect to database")
}

/// Apply the schema, statement by statement.
///
/// # Errors
/// Returns an error if any schema statement fails to execute.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
    }

    Ok(())
}

/// Insert the one-time bootstrap admin if no user with that email exists.
///
/// Returns whether a row was created.
///
/// # Errors
/// Returns an error if the lookup or insert fails.
pub async fn seed_admin(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
) -> Result<bool> {
    let existing = sqlx::query("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("failed to check for existing admin")?;

    if let Some(row) = existing {
        let id: i64 = row.get("id");
        info!("Bootstrap admin already present (user {id})");
        return Ok(false);
    }

    sqlx::query("INSERT INTO users (name, email, password_hash, role) VALUES (?, ?, ?, 'admin')")
        .bind("Administrator")
        .bind(email)
        .bind(password_hash)
        .execute(pool)
        .await
        .context("failed to seed bootstrap admin")?;

    info!("Seeded bootstrap admin {email}");
    Ok(true)
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

/// In-memory pool with the schema applied, shared by the handler tests.
///
/// A single connection keeps the `:memory:` database alive for the pool's
/// lifetime.
#[cfg(test)]
pub(crate) async fn memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .context("invalid in-memory DSN")?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .context("failed to open in-memory database")?;

    migrate(&pool).await?;
    Ok(pool)
}
