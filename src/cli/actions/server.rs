use crate::portal::{self, config::PortalConfig};
use anyhow::Result;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub identities: PathBuf,
    pub session_timeout_seconds: u64,
    pub max_login_attempts: u32,
    pub lockout_seconds: u64,
    pub journal_dir: String,
}

impl Args {
    fn config(&self) -> PortalConfig {
        PortalConfig::new()
            .with_session_timeout_seconds(self.session_timeout_seconds)
            .with_max_login_attempts(self.max_login_attempts)
            .with_lockout_seconds(self.lockout_seconds)
            .with_journal_dir(&self.journal_dir)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the identities cannot be loaded or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.config();
    debug!("Portal config: {:?}", config);

    portal::new(args.port, args.dsn, &args.identities, config).await
}
