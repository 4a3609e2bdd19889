// src/pipeline/details.rs

//! Show details from the lookup API.
//!
//! The lookup API tolerates only a slow request rate, so this is the one
//! stage that runs through the rate-limited dispatcher. Each run fetches at
//! most `chunk_size` shows that are not in `shows.details.json` yet, then
//! merges the new records into that file. Failed shows stay uncached and
//! are picked up again by the next run.

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{Config, FetchTarget, RunReport, Show, ShowDetails};
use crate::pipeline::{aggregate, select_fresh};
use crate::services::{Dispatcher, LookupDecoder};
use crate::storage::{CatalogStorage, DETAILS_FILE, load_cache, save_cache};

/// Fetch details for the next chunk of uncached shows.
pub async fn run_details(
    config: &Config,
    storage: &dyn CatalogStorage,
    dispatcher: &Dispatcher,
    shows: &[Show],
    cancel: &CancellationToken,
) -> Result<RunReport> {
    let mut report = RunReport::new("details", Utc::now());
    report.candidates = shows.len();
    log::info!("Starting details loading, {} shows total", shows.len());

    let mut cache = load_cache::<ShowDetails>(storage, DETAILS_FILE).await?;
    log::info!("Details found in cache: {}", cache.len());

    let candidates: Vec<FetchTarget> = shows
        .iter()
        .map(|show| FetchTarget::new(show.id, config.endpoints.lookup_url_for(show.id)))
        .collect();
    let plan = select_fresh(&candidates, &cache, config.crawler.chunk_size);
    log::info!(
        "Fetching {} fresh shows (chunk {}, every {:?})",
        plan.len(),
        config.crawler.chunk_size,
        config.crawler.rate_interval()
    );

    let results = dispatcher
        .dispatch_throttled(&plan, &LookupDecoder, config.crawler.rate_interval(), cancel)
        .await;
    let (details, errors) = aggregate(results);

    report.fetched = details.len();
    report.failed = errors.len();

    let added = cache.merge(details);
    save_cache(storage, DETAILS_FILE, &cache).await?;
    log::info!("Details loaded: {} new, {} total", added, cache.len());

    report.cached_total = cache.len();
    Ok(super::finish(report, &errors))
}
