// src/services/decoders.rs

//! Decoders for the three content types the catalog is built from.
//!
//! - [`LinkDecoder`]: HTML page -> `(label, url)` pairs
//! - [`LookupDecoder`]: iTunes lookup JSON -> [`ShowDetails`]
//! - [`FeedDecoder`]: RSS channel XML -> [`Feed`]

use std::collections::HashMap;

use scraper::{Html, Selector};
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, FetchError, Result};
use crate::models::{Feed, Podcast, ShowDetails, ShowImage};
use crate::services::fetcher::Decoder;
use crate::utils::resolve_url;

/// Extracts `(label, url)` pairs from links matched by a CSS selector.
///
/// Relative hrefs are resolved against the page URL. Elements without an
/// `href` attribute are skipped.
#[derive(Debug, Clone)]
pub struct LinkDecoder {
    selector: Selector,
}

impl LinkDecoder {
    pub fn new(pattern: &str) -> Result<Self> {
        let selector =
            Selector::parse(pattern).map_err(|e| AppError::selector(pattern, format!("{e:?}")))?;
        Ok(Self { selector })
    }
}

impl Decoder for LinkDecoder {
    type Entity = Vec<(String, String)>;

    fn decode(&self, url: &str, body: &[u8]) -> std::result::Result<Self::Entity, FetchError> {
        let base = Url::parse(url).map_err(|e| FetchError::decode(url, e))?;
        let document = Html::parse_document(&String::from_utf8_lossy(body));

        let links = document
            .select(&self.selector)
            .filter_map(|element| {
                let href = element.value().attr("href")?;
                let label = element.text().collect::<String>().trim().to_string();
                Some((label, resolve_url(&base, href)))
            })
            .collect();

        Ok(links)
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    results: Vec<LookupRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupRecord {
    collection_id: u64,
    #[serde(default)]
    artist_name: String,
    #[serde(default)]
    collection_name: String,
    #[serde(default)]
    genre_ids: Vec<String>,
    #[serde(default, rename = "artworkUrl30", alias = "artworkURL30")]
    artwork_url_30: String,
    #[serde(default, rename = "artworkUrl60", alias = "artworkURL60")]
    artwork_url_60: String,
    #[serde(default, rename = "artworkUrl100", alias = "artworkURL100")]
    artwork_url_100: String,
    #[serde(default)]
    feed_url: String,
}

/// The `id` query parameter of a lookup URL, if any.
fn requested_id(url: &str) -> Option<u64> {
    let url = Url::parse(url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .and_then(|(_, value)| value.parse().ok())
}

/// Decodes a lookup-by-id response into the first show record.
///
/// A record for another id than the requested one is rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct LookupDecoder;

impl Decoder for LookupDecoder {
    type Entity = ShowDetails;

    fn decode(&self, url: &str, body: &[u8]) -> std::result::Result<ShowDetails, FetchError> {
        let response: LookupResponse =
            serde_json::from_slice(body).map_err(|e| FetchError::decode(url, e))?;

        let record = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::empty(url, "show is not found"))?;

        if let Some(requested) = requested_id(url) {
            if requested != record.collection_id {
                return Err(FetchError::decode(
                    url,
                    format!(
                        "lookup for {requested} returned collection {}",
                        record.collection_id
                    ),
                ));
            }
        }

        Ok(ShowDetails {
            id: record.collection_id,
            name: record.collection_name,
            artist: record.artist_name,
            rss: record.feed_url,
            genres: record.genre_ids,
            image: ShowImage {
                small: record.artwork_url_30,
                medium: record.artwork_url_60,
                big: record.artwork_url_100,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    description: String,
    #[serde(default)]
    language: String,
    #[serde(default, rename = "lastBuildDate")]
    last_build_date: String,
    #[serde(default, rename = "item")]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default, rename = "pubDate")]
    pub_date: String,
}

/// Decodes an RSS channel into a [`Feed`] for the show owning the feed URL.
#[derive(Debug, Default, Clone)]
pub struct FeedDecoder {
    url_to_id: HashMap<String, u64>,
}

impl FeedDecoder {
    pub fn new(url_to_id: HashMap<String, u64>) -> Self {
        Self { url_to_id }
    }
}

impl Decoder for FeedDecoder {
    type Entity = Feed;

    fn decode(&self, url: &str, body: &[u8]) -> std::result::Result<Feed, FetchError> {
        let id = *self
            .url_to_id
            .get(url)
            .ok_or_else(|| FetchError::decode(url, "feed URL belongs to no requested show"))?;

        let text = std::str::from_utf8(body).map_err(|e| FetchError::decode(url, e))?;
        let rss: Rss = quick_xml::de::from_str(text).map_err(|e| FetchError::decode(url, e))?;
        let channel = rss.channel;

        let last_podcast = channel
            .items
            .into_iter()
            .next()
            .map(|item| Podcast {
                title: item.title.trim().to_string(),
                published: if item.pub_date.is_empty() {
                    channel.last_build_date.clone()
                } else {
                    item.pub_date
                },
                description: item.description.trim().to_string(),
            })
            .unwrap_or_default();

        Ok(Feed {
            id,
            language: primary_language(&channel.language),
            description: channel.description.trim().to_string(),
            last_podcast,
        })
    }
}

/// Primary language subtag, lowercased ("en-US" becomes "en").
fn primary_language(tag: &str) -> String {
    tag.trim()
        .to_lowercase()
        .split('-')
        .next()
        .unwrap_or_default()
        .to_string()
}
