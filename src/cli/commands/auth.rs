use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_BCRYPT_COST: &str = "bcrypt-cost";
pub const ARG_FRONTEND_URL: &str = "frontend-url";
pub const ARG_ADMIN_EMAIL: &str = "admin-email";
pub const ARG_ADMIN_PASSWORD: &str = "admin-password";

const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Secret used to sign session tokens")
                .env("DOCSHELF_SESSION_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session token lifetime in seconds")
                .default_value("604800")
                .env("DOCSHELF_SESSION_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64).range(60..)),
        )
        .arg(
            Arg::new(ARG_BCRYPT_COST)
                .long(ARG_BCRYPT_COST)
                .help("bcrypt work factor for password hashing")
                .default_value("10")
                .env("DOCSHELF_BCRYPT_COST")
                .value_parser(clap::value_parser!(u32).range(4..=31)),
        )
        .arg(
            Arg::new(ARG_FRONTEND_URL)
                .long(ARG_FRONTEND_URL)
                .help("Frontend base URL allowed as CORS origin (omit to disable CORS)")
                .env("DOCSHELF_FRONTEND_URL"),
        )
        .arg(
            Arg::new(ARG_ADMIN_EMAIL)
                .long(ARG_ADMIN_EMAIL)
                .help("Bootstrap admin email, seeded at startup when absent")
                .env("DOCSHELF_ADMIN_EMAIL")
                .requires(ARG_ADMIN_PASSWORD),
        )
        .arg(
            Arg::new(ARG_ADMIN_PASSWORD)
                .long(ARG_ADMIN_PASSWORD)
                .help("Bootstrap admin password")
                .env("DOCSHELF_ADMIN_PASSWORD")
                .requires(ARG_ADMIN_EMAIL),
        )
}

#[derive(Debug)]
pub struct Options {
    pub session_secret: String,
    pub session_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    pub frontend_url: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Options {
    /// Extract auth options from validated CLI matches.
    ///
    /// # Errors
    /// Returns an error if the session secret is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let session_secret = matches
            .get_one::<String>(ARG_SESSION_SECRET)
            .cloned()
            .context("missing required argument: --session-secret")?;

        Ok(Self {
            session_secret,
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_SESSION_TTL_SECONDS),
            bcrypt_cost: matches
                .get_one::<u32>(ARG_BCRYPT_COST)
                .copied()
                .unwrap_or(10),
            frontend_url: matches.get_one::<String>(ARG_FRONTEND_URL).cloned(),
            admin_email: matches.get_one::<String>(ARG_ADMIN_EMAIL).cloned(),
            admin_password: matches.get_one::<String>(ARG_ADMIN_PASSWORD).cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    fn clean_env<F: FnOnce()>(f: F) {
        temp_env::with_vars(
            [
                ("DOCSHELF_SESSION_TTL_SECONDS", None::<&str>),
                ("DOCSHELF_BCRYPT_COST", None),
                ("DOCSHELF_FRONTEND_URL", None),
                ("DOCSHELF_ADMIN_EMAIL", None),
                ("DOCSHELF_ADMIN_PASSWORD", None),
            ],
            f,
        );
    }

    #[test]
    fn defaults_applied() {
        clean_env(|| {
            let matches = commands::new().get_matches_from(vec![
                "docshelf",
                "--session-secret",
                "super-secret",
            ]);
            let options = Options::parse(&matches).expect("options");
            assert_eq!(options.session_secret, "super-secret");
            assert_eq!(options.session_ttl_seconds, DEFAULT_SESSION_TTL_SECONDS);
            assert_eq!(options.bcrypt_cost, 10);
            assert!(options.frontend_url.is_none());
            assert!(options.admin_email.is_none());
        });
    }

    #[test]
    fn admin_seed_requires_both_halves() {
        clean_env(|| {
            let result = commands::new().try_get_matches_from(vec![
                "docshelf",
                "--session-secret",
                "super-secret",
                "--admin-email",
                "root@example.com",
            ]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn admin_seed_pair_accepted() {
        clean_env(|| {
            let matches = commands::new().get_matches_from(vec![
                "docshelf",
                "--session-secret",
                "super-secret",
                "--admin-email",
                "root@example.com",
                "--admin-password",
                "changeme",
            ]);
            let options = Options::parse(&matches).expect("options");
            assert_eq!(options.admin_email.as_deref(), Some("root@example.com"));
            assert_eq!(options.admin_password.as_deref(), Some("changeme"));
        });
    }
}
