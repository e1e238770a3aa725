//! Stateless session codec.
//!
//! Tokens are HS256 JWTs carrying `{sub, email, iat, exp}` and nothing else.
//! The caller's role is deliberately absent: authorization re-reads it from
//! the credential store on every request, so a role change is effective on
//! the next request without reissuing the token.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use anyhow::{Context, Result};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: i64,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Why a presented session was rejected. Log-only detail: the HTTP layer
/// collapses all three into the same 401 response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionRejection {
    Missing,
    Invalid,
    Expired,
}

impl fmt::Display for SessionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "no session token presented"),
            Self::Invalid => write!(f, "session token malformed or badly signed"),
            Self::Expired => write!(f, "session token expired"),
        }
    }
}

/// Sign a session token for the given user.
///
/// # Errors
/// Returns an error if encoding fails.
pub fn issue(user_id: i64, email: &str, secret: &[u8], ttl_seconds: i64) -> Result<String> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: user_id,
        email: email.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ttl_seconds)).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .context("failed to sign session token")
}

/// Verify a session token, returning its claims.
///
/// # Errors
/// Returns [`SessionRejection::Expired`] once `exp` has passed (no leeway)
/// and [`SessionRejection::Invalid`] for any other decode failure.
pub fn verify(token: &str, secret: &[u8]) -> Result<SessionClaims, SessionRejection> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    // A token is valid in [iat, exp), not a minute longer.
    validation.leeway = 0;

    match decode::<SessionClaims>(token, &DecodingKey::from_secret(secret), &validation) {
        Ok(data) => Ok(data.claims),
        Err(err) => match err.kind() {
            ErrorKind::ExpiredSignature => Err(SessionRejection::Expired),
            _ => Err(SessionRejection::Invalid),
        },
    }
}
