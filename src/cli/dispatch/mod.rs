//! Command-line argument dispatch.
//!
//! Maps validated CLI arguments to the action the binary executes.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{portal, ARG_DSN, ARG_IDENTITIES, ARG_PORT, CMD_HASH_PASSWORD};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if matches.subcommand_name() == Some(CMD_HASH_PASSWORD) {
        return Ok(Action::HashPassword);
    }

    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let identities = matches
        .get_one::<String>(ARG_IDENTITIES)
        .map(PathBuf::from)
        .context("missing required argument: --identities")?;

    let portal_opts = portal::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        identities,
        session_timeout_seconds: portal_opts.session_timeout_seconds,
        max_login_attempts: portal_opts.max_login_attempts,
        lockout_seconds: portal_opts.lockout_seconds,
        journal_dir: portal_opts.journal_dir,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_action() {
        temp_env::with_vars(
            [
                ("PORTAL_PORT", None::<&str>),
                ("PORTAL_LOCKOUT_SECONDS", Some("120")),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec![
                    "patient-portal",
                    "--dsn",
                    "postgres://portal@localhost:5432/portal",
                    "--identities",
                    "identities.json",
                ]);
                match handler(&matches) {
                    Ok(Action::Server(args)) => {
                        assert_eq!(args.port, 8080);
                        assert_eq!(args.identities, PathBuf::from("identities.json"));
                        assert_eq!(args.lockout_seconds, 120);
                        assert_eq!(args.max_login_attempts, 5);
                    }
                    other => panic!("expected server action, got {other:?}"),
                }
            },
        );
    }

    #[test]
    fn hash_password_action() {
        temp_env::with_vars(
            [("PORTAL_DSN", None::<&str>), ("PORTAL_IDENTITIES", None)],
            || {
                let matches = crate::cli::commands::new()
                    .get_matches_from(vec!["patient-portal", CMD_HASH_PASSWORD]);
                assert!(matches!(handler(&matches), Ok(Action::HashPassword)));
            },
        );
    }
}
