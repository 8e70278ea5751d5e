//! Runtime settings of the portal.

use std::{path::PathBuf, time::Duration};

use super::{rate_limit, session};

const DEFAULT_JOURNAL_DIR: &str = "logs";

#[derive(Clone, Debug)]
pub struct PortalConfig {
    session_timeout: Duration,
    max_login_attempts: u32,
    lockout: Duration,
    journal_dir: PathBuf,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PortalConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_timeout: session::DEFAULT_SESSION_TIMEOUT,
            max_login_attempts: rate_limit::DEFAULT_MAX_ATTEMPTS,
            lockout: rate_limit::DEFAULT_LOCKOUT,
            journal_dir: PathBuf::from(DEFAULT_JOURNAL_DIR),
        }
    }

    #[must_use]
    pub fn with_session_timeout_seconds(mut self, seconds: u64) -> Self {
        self.session_timeout = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_max_login_attempts(mut self, attempts: u32) -> Self {
        self.max_login_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_lockout_seconds(mut self, seconds: u64) -> Self {
        self.lockout = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_journal_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.journal_dir = dir.into();
        self
    }

    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    #[must_use]
    pub fn max_login_attempts(&self) -> u32 {
        self.max_login_attempts
    }

    #[must_use]
    pub fn lockout(&self) -> Duration {
        self.lockout
    }

    #[must_use]
    pub fn journal_dir(&self) -> &PathBuf {
        &self.journal_dir
    }
}
