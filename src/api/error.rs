//! Error taxonomy for the HTTP boundary.
//!
//! Every failure a handler can produce maps here to a status code and a
//! stable `{"error": code}` body. Store-level constraint violations are
//! translated before they reach this type; unexpected failures collapse into
//! `server_error` with the detail logged, never echoed to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use super::handlers::auth::token::SessionRejection;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("missing fields")]
    MissingFields,
    #[error("missing path")]
    MissingPath,
    #[error("invalid role")]
    InvalidRole,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("unauthorized: {0}")]
    Unauthorized(SessionRejection),
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("email taken")]
    EmailTaken,
    #[error("conflict")]
    Conflict,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            Self::MissingFields => (StatusCode::BAD_REQUEST, "missing_fields"),
            Self::MissingPath => (StatusCode::BAD_REQUEST, "missing_path"),
            Self::InvalidRole => (StatusCode::BAD_REQUEST, "invalid_role"),
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            Self::Unauthorized(rejection) => {
                // The variant matters for operators, not for clients: absent,
                // malformed and expired tokens are indistinguishable on the wire.
                warn!("session rejected: {rejection}");
                (StatusCode::UNAUTHORIZED, "unauthorized")
            }
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            Self::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            Self::EmailTaken => (StatusCode::CONFLICT, "email_taken"),
            Self::Conflict => (StatusCode::CONFLICT, "conflict"),
            Self::Internal(err) => {
                error!("internal error: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "server_error")
            }
        };

        (status, Json(json!({ "error": code }))).into_response()
    }
}
