//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Remote endpoints and link patterns
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Output locations
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.rate_interval_ms == 0 {
            return Err(AppError::validation(
                "crawler.rate_interval_ms must be > 0",
            ));
        }
        if self.endpoints.lookup_url.trim().is_empty() {
            return Err(AppError::validation("endpoints.lookup_url is empty"));
        }
        url::Url::parse(&self.endpoints.genre_index_url)?;
        url::Url::parse(&self.endpoints.lookup_url)?;
        for pattern in [
            &self.endpoints.genre_selector,
            &self.endpoints.show_selector,
        ] {
            Selector::parse(pattern).map_err(|e| AppError::selector(pattern, format!("{e:?}")))?;
        }
        Ok(())
    }

    /// Absolute path of a catalog file inside the output directory.
    pub fn output_file(&self, file_name: &str) -> PathBuf {
        self.paths.output_dir.join(file_name)
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Minimum spacing between lookups in rate-limited mode
    #[serde(default = "defaults::rate_interval")]
    pub rate_interval_ms: u64,

    /// Maximum number of fresh targets fetched per run
    #[serde(default = "defaults::chunk_size")]
    pub chunk_size: usize,

    /// Retries on transport errors (never on HTTP status errors)
    #[serde(default = "defaults::transport_retries")]
    pub transport_retries: u32,

    /// Sleep before a transport retry, in milliseconds
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl CrawlerConfig {
    pub fn rate_interval(&self) -> Duration {
        Duration::from_millis(self.rate_interval_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            rate_interval_ms: defaults::rate_interval(),
            chunk_size: defaults::chunk_size(),
            transport_retries: defaults::transport_retries(),
            retry_backoff_ms: defaults::retry_backoff(),
        }
    }
}

/// Remote endpoints of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Page listing every podcast genre
    #[serde(default = "defaults::genre_index_url")]
    pub genre_index_url: String,

    /// CSS selector matching genre links on the index page
    #[serde(default = "defaults::genre_selector")]
    pub genre_selector: String,

    /// CSS selector matching show links on a genre page
    #[serde(default = "defaults::show_selector")]
    pub show_selector: String,

    /// Lookup API base; the show id is appended as `?id=`
    #[serde(default = "defaults::lookup_url")]
    pub lookup_url: String,
}

impl EndpointsConfig {
    /// Lookup URL for a single show.
    pub fn lookup_url_for(&self, id: u64) -> String {
        format!("{}?id={}", self.lookup_url, id)
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            genre_index_url: defaults::genre_index_url(),
            genre_selector: defaults::genre_selector(),
            show_selector: defaults::show_selector(),
            lookup_url: defaults::lookup_url(),
        }
    }
}

/// Output file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding every generated catalog file
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: defaults::output_dir(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; podcrawl/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn rate_interval() -> u64 {
        5000
    }
    pub fn chunk_size() -> usize {
        100
    }
    pub fn transport_retries() -> u32 {
        1
    }
    pub fn retry_backoff() -> u64 {
        1000
    }

    // Endpoint defaults
    pub fn genre_index_url() -> String {
        "https://podcasts.apple.com/us/genre/podcasts/id26".into()
    }
    pub fn genre_selector() -> String {
        ".top-level-genre, .top-level-subgenres a[href]".into()
    }
    pub fn show_selector() -> String {
        "div[id=selectedcontent] .column a[href]".into()
    }
    pub fn lookup_url() -> String {
        "https://itunes.apple.com/lookup".into()
    }

    // Path defaults
    pub fn output_dir() -> PathBuf {
        PathBuf::from("/tmp")
    }
}
