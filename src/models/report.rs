// src/models/report.rs

//! Summary of a single command run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counts reported at the end of each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Candidates considered before cache filtering
    pub candidates: usize,
    /// Targets fetched and decoded successfully
    pub fetched: usize,
    /// Targets that ended with an error
    pub failed: usize,
    /// Entries in the persisted file after the run
    pub cached_total: usize,
}

impl RunReport {
    pub fn new(command: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            command: command.into(),
            started_at,
            finished_at: started_at,
            candidates: 0,
            fetched: 0,
            failed: 0,
            cached_total: 0,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn elapsed_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// Log the report as a summary block.
    pub fn log(&self) {
        log::info!(
            "[SUMMARY] {}: {} candidates, {} fetched, {} failed, {} cached ({}s)",
            self.command,
            self.candidates,
            self.fetched,
            self.failed,
            self.cached_total,
            self.elapsed_secs()
        );
    }
}
