//! Pipeline entry points for crawler operations.
//!
//! - `run_genres`: Resolve genres from the genre index page
//! - `run_shows`: Resolve shows from every genre page
//! - `run_details`: Rate-limited lookups for shows not cached yet
//! - `run_feeds`: RSS channel data for details not cached yet
//! - `run_compact`: Join everything into one flat list

pub mod aggregate;
pub mod compact;
pub mod details;
pub mod feeds;
pub mod genres;
pub mod select;
pub mod shows;

pub use aggregate::aggregate;
pub use compact::{compact, run_compact};
pub use details::run_details;
pub use feeds::run_feeds;
pub use genres::run_genres;
pub use select::select_fresh;
pub use shows::run_shows;

use crate::error::FetchError;
use crate::models::RunReport;

/// Log every failure with enough context to retry it by hand.
fn log_failures(command: &str, errors: &[FetchError]) {
    if errors.is_empty() {
        return;
    }
    log::warn!("{}: {} targets failed", command, errors.len());
    for error in errors {
        log::warn!("    {}", error);
    }
}

/// Close a report and log it together with its failures.
fn finish(mut report: RunReport, errors: &[FetchError]) -> RunReport {
    report.finished_at = chrono::Utc::now();
    log_failures(&report.command, errors);
    report.log();
    report
}
