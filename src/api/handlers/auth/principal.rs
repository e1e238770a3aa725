//! Authenticated principal extraction and role enforcement.
//!
//! Flow Overview: read the session cookie, verify the token, and return a
//! principal for downstream handlers. Role checks never trust the token:
//! [`require_role`] re-reads the caller's current role from the credential
//! store, so `set_role` takes effect on the target's very next request.

use axum::http::HeaderMap;
use sqlx::SqlitePool;
use std::fmt;

use crate::api::error::ApiError;

use super::{
    session::extract_session_token,
    state::AuthState,
    storage::current_role,
    token::{self, SessionRejection},
};

/// Permission tiers in their fixed total order. The derived `Ord` follows
/// declaration order, which is the authorization order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    User,
    Editor,
    Admin,
}

impl Role {
    /// Parse one of the exactly three accepted role names.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "editor" => Some(Self::Editor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated user context derived from the session cookie.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
}

/// Resolve the session cookie into a principal.
///
/// # Errors
/// Returns `Unauthorized` when the cookie is absent, malformed or expired.
pub fn require_session(headers: &HeaderMap, auth_state: &AuthState) -> Result<Principal, ApiError> {
    let Some(raw) = extract_session_token(headers) else {
        return Err(ApiError::Unauthorized(SessionRejection::Missing));
    };
    let claims = token::verify(&raw, auth_state.config().session_secret())
        .map_err(ApiError::Unauthorized)?;
    Ok(Principal {
        user_id: claims.sub,
        email: claims.email,
    })
}

/// Like [`require_session`], but absence or invalidity is not an error.
/// Used by public reads whose response varies for authenticated callers.
pub fn maybe_session(headers: &HeaderMap, auth_state: &AuthState) -> Option<Principal> {
    require_session(headers, auth_state).ok()
}

/// Enforce a minimum role with a fresh read from the credential store.
///
/// A principal whose user row has disappeared is treated as an invalid
/// session, not as forbidden.
///
/// # Errors
/// Returns `Forbidden` when the caller's current role is below `minimum`.
pub async fn require_role(
    pool: &SqlitePool,
    principal: &Principal,
    minimum: Role,
) -> Result<Role, ApiError> {
    let Some(role) = current_role(pool, principal.user_id).await? else {
        return Err(ApiError::Unauthorized(SessionRejection::Invalid));
    };
    if role < minimum {
        return Err(ApiError::Forbidden);
    }
    Ok(role)
}
