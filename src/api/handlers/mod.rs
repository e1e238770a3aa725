//! API handlers and shared utilities.
//!
//! This module organizes the service's route handlers and provides common
//! helpers used across them.

pub mod auth;
pub mod favorites;
pub mod health;
pub mod history;
pub mod notes;
pub mod posts;
pub mod users;

use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;

/// Lightweight email sanity check used before persisting account data.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Body for endpoints that only acknowledge.
#[derive(Debug, Serialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}
