// src/pipeline/shows.rs

//! Show discovery across genre pages.

use chrono::Utc;

use crate::error::Result;
use crate::models::{Config, FetchTarget, Genre, RunReport, Show};
use crate::services::{Dispatcher, EntityResolver};
use crate::storage::{CatalogStorage, SHOWS_FILE, load_cache, save_cache};

/// Resolve shows on every genre page and merge them into `shows.json`.
///
/// Genre pages are few, so they are fetched without throttling.
pub async fn run_shows(
    config: &Config,
    storage: &dyn CatalogStorage,
    dispatcher: &Dispatcher,
    genres: &[Genre],
) -> Result<RunReport> {
    let mut report = RunReport::new("shows", Utc::now());
    log::info!("Starting shows loading from {} genres", genres.len());

    let pages: Vec<FetchTarget> = genres
        .iter()
        .map(|genre| FetchTarget::new(genre.id, genre.url.as_str()))
        .collect();

    let resolver = EntityResolver::new(dispatcher, &config.endpoints.show_selector)?;
    let resolution = resolver.resolve(&pages).await;

    let shows: Vec<Show> = resolution
        .entities
        .into_iter()
        .map(|e| Show {
            id: e.id,
            name: e.label,
            url: e.url,
        })
        .collect();

    report.fetched = shows.len();
    report.failed = resolution.errors.len();
    report.candidates = report.fetched + report.failed;

    let mut cache = load_cache::<Show>(storage, SHOWS_FILE).await?;
    let added = cache.merge(shows);
    save_cache(storage, SHOWS_FILE, &cache).await?;
    log::info!("Shows loaded: {} new, {} total", added, cache.len());

    report.cached_total = cache.len();
    Ok(super::finish(report, &resolution.errors))
}
