// src/services/progress.rs

//! Progress reporting for dispatcher runs, decoupled from result collection.

use crate::error::FetchError;

/// Receives progress notifications while a dispatcher run is in flight.
pub trait Progress: Send + Sync {
    /// Called once before the first fetch.
    fn started(&self, total: usize);

    /// Called once per target, in completion order.
    fn completed(&self, done: usize, total: usize, url: &str, error: Option<&FetchError>);
}

/// Logs every completed target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn started(&self, total: usize) {
        log::debug!("Dispatching {} targets", total);
    }

    fn completed(&self, done: usize, total: usize, url: &str, error: Option<&FetchError>) {
        match error {
            None => log::info!("Requested ({}/{}) - {}", done, total, url),
            Some(e) => log::warn!("Failed ({}/{}) - {}", done, total, e),
        }
    }
}

/// Discards progress notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn started(&self, _total: usize) {}

    fn completed(&self, _done: usize, _total: usize, _url: &str, _error: Option<&FetchError>) {}
}
