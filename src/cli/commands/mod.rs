pub mod auth;
pub mod logging;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("docshelf")
        .about("Documentation site backend: sessions, roles and content")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("DOCSHELF_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .long_help(
                    "SQLite connection string, e.g. sqlite://docshelf.db. The file is created if missing.",
                )
                .default_value("sqlite://docshelf.db")
                .env("DOCSHELF_DSN"),
        );

    let command = auth::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "docshelf");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Documentation site backend: sessions, roles and content".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_check_port_and_dsn() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "docshelf",
            "--port",
            "8081",
            "--dsn",
            "sqlite:///tmp/docshelf.db",
            "--session-secret",
            "super-secret",
        ]);

        assert_eq!(matches.get_one::<u16>("port").copied(), Some(8081));
        assert_eq!(
            matches.get_one::<String>("dsn").cloned(),
            Some("sqlite:///tmp/docshelf.db".to_string())
        );
        assert_eq!(
            matches.get_one::<String>(auth::ARG_SESSION_SECRET).cloned(),
            Some("super-secret".to_string())
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("DOCSHELF_PORT", Some("443")),
                ("DOCSHELF_DSN", Some("sqlite:///var/lib/docshelf.db")),
                ("DOCSHELF_SESSION_SECRET", Some("env-secret")),
                ("DOCSHELF_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["docshelf"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>("dsn").cloned(),
                    Some("sqlite:///var/lib/docshelf.db".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>(auth::ARG_SESSION_SECRET).cloned(),
                    Some("env-secret".to_string())
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("DOCSHELF_LOG_LEVEL", Some(level)),
                    ("DOCSHELF_SESSION_SECRET", Some("env-secret")),
                ],
                || {
                    let command = new();
                    let matches = command.get_matches_from(vec!["docshelf"]);
                    assert_eq!(
                        matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                        u8::try_from(index).ok()
                    );
                },
            );
        }
    }
}
