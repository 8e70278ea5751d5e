//! Monthly append-only appointment journal.
//!
//! One JSON object per line in `<dir>/appointments_YYYY-MM.log`. Appends are
//! serialised through an in-process lock so concurrent bookings never
//! interleave within a line.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::PathBuf;
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::debug;

use super::appointment::AppointmentRecord;

#[derive(Serialize)]
struct JournalEntry<'a> {
    timestamp: String,
    appointment: &'a AppointmentRecord,
}

#[derive(Debug)]
pub struct AppointmentJournal {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl AppointmentJournal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// File receiving entries written at `now`.
    #[must_use]
    pub fn path_for(&self, now: NaiveDateTime) -> PathBuf {
        self.dir
            .join(format!("appointments_{}.log", now.format("%Y-%m")))
    }

    /// Append `record`, creating the directory on first use.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub async fn append(&self, record: &AppointmentRecord, now: NaiveDateTime) -> Result<PathBuf> {
        let entry = JournalEntry {
            timestamp: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            appointment: record,
        };
        let mut line = serde_json::to_string(&entry).context("failed to encode journal entry")?;
        line.push('\n');

        let path = self.path_for(now);
        let _guard = self.lock.lock().await;

        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create journal dir: {}", self.dir.display()))?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open journal: {}", path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("failed to append journal: {}", path.display()))?;
        file.flush().await.context("failed to flush journal")?;

        debug!(appointment_id = %record.appointment_id, "appointment journaled");

        Ok(path)
    }
}
