//! Login, session and journal settings.

use clap::{Arg, Command};

pub const ARG_SESSION_TIMEOUT_SECONDS: &str = "session-timeout-seconds";
pub const ARG_MAX_LOGIN_ATTEMPTS: &str = "max-login-attempts";
pub const ARG_LOCKOUT_SECONDS: &str = "lockout-seconds";
pub const ARG_JOURNAL_DIR: &str = "journal-dir";

const MAX_LOCKOUT_SECONDS: u64 = crate::portal::rate_limit::MAX_LOCKOUT.as_secs();

#[derive(Debug)]
pub struct Options {
    pub session_timeout_seconds: u64,
    pub max_login_attempts: u32,
    pub lockout_seconds: u64,
    pub journal_dir: String,
}

impl Options {
    /// Read the portal settings from validated matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is somehow absent.
    pub fn parse(matches: &clap::ArgMatches) -> anyhow::Result<Self> {
        Ok(Self {
            session_timeout_seconds: required(matches, ARG_SESSION_TIMEOUT_SECONDS)?,
            max_login_attempts: required(matches, ARG_MAX_LOGIN_ATTEMPTS)?,
            lockout_seconds: required(matches, ARG_LOCKOUT_SECONDS)?,
            journal_dir: required(matches, ARG_JOURNAL_DIR)?,
        })
    }
}

fn required<T>(matches: &clap::ArgMatches, name: &str) -> anyhow::Result<T>
where
    T: Clone + Send + Sync + 'static,
{
    matches
        .get_one::<T>(name)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --{name}"))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TIMEOUT_SECONDS)
                .long(ARG_SESSION_TIMEOUT_SECONDS)
                .help("Seconds after login before a session expires")
                .env("PORTAL_SESSION_TIMEOUT_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_MAX_LOGIN_ATTEMPTS)
                .long(ARG_MAX_LOGIN_ATTEMPTS)
                .help("Failed logins allowed per email before lockout")
                .env("PORTAL_MAX_LOGIN_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOCKOUT_SECONDS)
                .long(ARG_LOCKOUT_SECONDS)
                .help("Lockout duration in seconds, at most 30 days")
                .env("PORTAL_LOCKOUT_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_LOCKOUT_SECONDS)),
        )
        .arg(
            Arg::new(ARG_JOURNAL_DIR)
                .long(ARG_JOURNAL_DIR)
                .help("Directory for the monthly appointment journals")
                .env("PORTAL_JOURNAL_DIR")
                .default_value("logs"),
        )
}
