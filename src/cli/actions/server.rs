use crate::api::{self, AdminSeed, handlers::auth::AuthConfig};
use anyhow::Result;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub session_secret: String,
    pub session_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    pub frontend_url: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database cannot be opened or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new(args.session_secret)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_bcrypt_cost(args.bcrypt_cost);

    let admin_seed = match (args.admin_email, args.admin_password) {
        (Some(email), Some(password)) => Some(AdminSeed { email, password }),
        _ => None,
    };

    api::new(args.port, args.dsn, auth_config, admin_seed, args.frontend_url).await
}
