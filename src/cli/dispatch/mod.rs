//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::auth;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        session_secret: auth_opts.session_secret,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        bcrypt_cost: auth_opts.bcrypt_cost,
        frontend_url: auth_opts.frontend_url,
        admin_email: auth_opts.admin_email,
        admin_password: auth_opts.admin_password,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_secret_required() {
        temp_env::with_vars([("DOCSHELF_SESSION_SECRET", None::<&str>)], || {
            let command = crate::cli::commands::new();
            let result = command.try_get_matches_from(vec!["docshelf"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn server_action_built_from_matches() {
        temp_env::with_vars(
            [
                ("DOCSHELF_SESSION_SECRET", Some("super-secret")),
                ("DOCSHELF_DSN", Some("sqlite://test.db")),
                ("DOCSHELF_PORT", Some("9090")),
                ("DOCSHELF_ADMIN_EMAIL", None),
                ("DOCSHELF_ADMIN_PASSWORD", None),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["docshelf"]);
                let action = handler(&matches).expect("server action");
                let Action::Server(args) = action;
                assert_eq!(args.port, 9090);
                assert_eq!(args.dsn, "sqlite://test.db");
                assert_eq!(args.session_secret, "super-secret");
                assert!(args.admin_email.is_none());
            },
        );
    }
}
