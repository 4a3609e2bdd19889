// src/pipeline/feeds.rs

//! RSS channel data for shows with a known feed URL.

use std::collections::HashMap;

use chrono::Utc;

use crate::error::Result;
use crate::models::{Config, Feed, FetchTarget, RunReport, ShowDetails};
use crate::pipeline::{aggregate, select_fresh};
use crate::services::{Dispatcher, FeedDecoder};
use crate::storage::{CatalogStorage, FEEDS_FILE, load_cache, save_cache};

/// Fetch the feeds of the next chunk of shows missing from `shows.feed.json`.
///
/// Shows without an RSS URL are not candidates. Feed hosts are all
/// different servers, so the plan is fetched concurrently.
pub async fn run_feeds(
    config: &Config,
    storage: &dyn CatalogStorage,
    dispatcher: &Dispatcher,
    details: &[ShowDetails],
) -> Result<RunReport> {
    let mut report = RunReport::new("feeds", Utc::now());

    let candidates: Vec<FetchTarget> = details
        .iter()
        .filter(|d| !d.rss.trim().is_empty())
        .map(|d| FetchTarget::new(d.id, d.rss.trim()))
        .collect();
    report.candidates = candidates.len();
    log::info!(
        "Starting feeds loading, {} of {} shows have a feed",
        candidates.len(),
        details.len()
    );

    let mut cache = load_cache::<Feed>(storage, FEEDS_FILE).await?;
    let plan = select_fresh(&candidates, &cache, config.crawler.chunk_size);
    log::info!("Feeds found in cache: {}, fetching {}", cache.len(), plan.len());

    // Shows sharing a feed URL get one request and a copy of the feed each.
    let mut sharing: HashMap<String, Vec<u64>> = HashMap::new();
    let mut requests = Vec::new();
    for target in &plan {
        let ids = sharing.entry(target.url.clone()).or_default();
        if ids.is_empty() {
            requests.push(target.clone());
        }
        ids.push(target.id);
    }

    let url_to_id: HashMap<String, u64> = requests.iter().map(|t| (t.url.clone(), t.id)).collect();
    let decoder = FeedDecoder::new(url_to_id);

    let results = dispatcher.dispatch_all(&requests, &decoder).await;
    let (fetched, errors) = aggregate(results);
    let feeds = fan_out(fetched, &requests, &sharing);

    report.fetched = feeds.len();
    report.failed = errors.len();

    let added = cache.merge(feeds);
    save_cache(storage, FEEDS_FILE, &cache).await?;
    log::info!("Feeds loaded: {} new, {} total", added, cache.len());

    report.cached_total = cache.len();
    Ok(super::finish(report, &errors))
}

/// Copy each fetched feed to every show requesting the same URL.
fn fan_out(
    fetched: Vec<Feed>,
    requests: &[FetchTarget],
    sharing: &HashMap<String, Vec<u64>>,
) -> Vec<Feed> {
    let url_of: HashMap<u64, &str> = requests.iter().map(|t| (t.id, t.url.as_str())).collect();

    let mut feeds = Vec::with_capacity(fetched.len());
    for feed in fetched {
        let ids = url_of
            .get(&feed.id)
            .and_then(|url| sharing.get(*url))
            .map(Vec::as_slice)
            .unwrap_or_default();
        for id in ids.iter().skip(1) {
            feeds.push(Feed {
                id: *id,
                ..feed.clone()
            });
        }
        feeds.push(feed);
    }
    feeds
}
