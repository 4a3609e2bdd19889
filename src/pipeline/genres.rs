// src/pipeline/genres.rs

//! Genre discovery.

use chrono::Utc;

use crate::error::Result;
use crate::models::{Config, FetchTarget, Genre, RunReport};
use crate::services::{Dispatcher, EntityResolver};
use crate::storage::{CatalogStorage, GENRES_FILE, load_cache, save_cache};
use crate::utils::extract_entity_id;

/// Resolve genres on the index page and merge them into `genres.json`.
pub async fn run_genres(
    config: &Config,
    storage: &dyn CatalogStorage,
    dispatcher: &Dispatcher,
) -> Result<RunReport> {
    let mut report = RunReport::new("genres", Utc::now());
    log::info!("Starting genres loading");

    let index_url = &config.endpoints.genre_index_url;
    let index = FetchTarget::new(extract_entity_id(index_url).unwrap_or_default(), index_url.as_str());

    let resolver = EntityResolver::new(dispatcher, &config.endpoints.genre_selector)?;
    let resolution = resolver.resolve(&[index]).await;

    let genres: Vec<Genre> = resolution
        .entities
        .into_iter()
        .map(|e| Genre {
            id: e.id,
            name: e.label,
            url: e.url,
        })
        .collect();

    report.fetched = genres.len();
    report.failed = resolution.errors.len();
    report.candidates = report.fetched + report.failed;

    let mut cache = load_cache::<Genre>(storage, GENRES_FILE).await?;
    let added = cache.merge(genres);
    save_cache(storage, GENRES_FILE, &cache).await?;
    log::info!(
        "Genres loaded: {} new, {} total in {}",
        added,
        cache.len(),
        storage.location(GENRES_FILE)
    );

    report.cached_total = cache.len();
    Ok(super::finish(report, &resolution.errors))
}
