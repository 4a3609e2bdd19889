//! Utility functions and helpers.

pub mod http;

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::error::FetchError;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Extract the catalog id from a URL.
///
/// The id is the last path segment with its `id` prefix removed, e.g.
/// `https://podcasts.apple.com/us/genre/podcasts-arts/id1301` gives `1301`.
pub fn extract_entity_id(url: &str) -> Result<u64, FetchError> {
    static ID_SEGMENT: OnceLock<Regex> = OnceLock::new();
    let pattern = ID_SEGMENT.get_or_init(|| Regex::new(r"^(?:id)?(\d+)$").expect("valid regex"));

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').next().unwrap_or_default();

    let digits = pattern
        .captures(last)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| FetchError::identifier(url, format!("no numeric id in '{last}'")))?;

    digits
        .as_str()
        .parse()
        .map_err(|e| FetchError::identifier(url, e))
}
