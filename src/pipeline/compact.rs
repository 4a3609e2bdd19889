// src/pipeline/compact.rs

//! Flat export joining every catalog file.

use std::collections::HashMap;

use chrono::Utc;

use crate::error::Result;
use crate::models::{CompactImage, CompactShow, Feed, Genre, RunReport, Show, ShowDetails};
use crate::storage::{
    CatalogStorage, COMPACT_FILE, DETAILS_FILE, FEEDS_FILE, GENRES_FILE, SHOWS_FILE, load_cache,
    load_required, save_list,
};

/// Join shows with their details, feeds and genre names.
///
/// One entry per show, in show order. Details override the scraped name and
/// contribute feed URL, author, artwork and genres; feeds contribute language
/// and description. Genre ids that are not numeric or not known are dropped.
pub fn compact(
    shows: &[Show],
    details: &[ShowDetails],
    feeds: &[Feed],
    genres: &[Genre],
) -> Vec<CompactShow> {
    let details: HashMap<u64, &ShowDetails> = details.iter().map(|d| (d.id, d)).collect();
    let feeds: HashMap<u64, &Feed> = feeds.iter().map(|f| (f.id, f)).collect();
    let genre_names: HashMap<u64, &str> = genres.iter().map(|g| (g.id, g.name.as_str())).collect();

    shows
        .iter()
        .map(|show| {
            let mut entry = CompactShow {
                id: show.id,
                show_url: show.url.clone(),
                name: show.name.clone(),
                ..CompactShow::default()
            };

            if let Some(d) = details.get(&show.id) {
                if !d.name.is_empty() {
                    entry.name = d.name.clone();
                }
                entry.feed_url = d.rss.clone();
                entry.author = d.artist.clone();
                entry.image = CompactImage {
                    xl: d.image.big.clone(),
                    xs: d.image.small.clone(),
                    md: d.image.medium.clone(),
                };
                entry.genres = d
                    .genres
                    .iter()
                    .filter_map(|id| id.trim().parse::<u64>().ok())
                    .filter_map(|id| genre_names.get(&id))
                    .map(|name| name.to_string())
                    .collect();
            }

            if let Some(f) = feeds.get(&show.id) {
                entry.language = f.language.clone();
                entry.description = f.description.clone();
            }

            entry
        })
        .collect()
}

/// Build `shows.compact.json` from the files in `storage`.
///
/// `shows.json` must exist; the other files may be missing.
pub async fn run_compact(storage: &dyn CatalogStorage) -> Result<RunReport> {
    let mut report = RunReport::new("compact", Utc::now());

    let shows: Vec<Show> = load_required(storage, SHOWS_FILE).await?;
    let details = load_cache::<ShowDetails>(storage, DETAILS_FILE).await?;
    let feeds = load_cache::<Feed>(storage, FEEDS_FILE).await?;
    let genres = load_cache::<Genre>(storage, GENRES_FILE).await?;
    log::info!(
        "Compacting {} shows ({} details, {} feeds, {} genres)",
        shows.len(),
        details.len(),
        feeds.len(),
        genres.len()
    );

    let entries = compact(&shows, details.entries(), feeds.entries(), genres.entries());
    save_list(storage, COMPACT_FILE, &entries).await?;
    log::info!("Compact list written to {}", storage.location(COMPACT_FILE));

    report.candidates = shows.len();
    report.fetched = entries.len();
    report.cached_total = entries.len();
    Ok(super::finish(report, &[]))
}
