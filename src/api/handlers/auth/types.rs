use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Display name; defaults to the part of the email before the `@`.
    pub name: Option<String>,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body returned by register and login alongside the session cookie.
#[derive(Debug, Serialize, ToSchema)]
pub struct IdentityResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Full profile returned by the current-user endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub avatar_url: String,
    pub bio: String,
    pub description: String,
}
