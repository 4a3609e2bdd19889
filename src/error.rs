// src/error.rs

//! Unified error handling for the catalog crawler.
//!
//! Two layers of errors exist:
//! - [`FetchError`] belongs to a single target. It is captured inside a
//!   `FetchResult` and travels with the rest of the data.
//! - [`AppError`] aborts a whole run (unreadable cache, bad config, ...).

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Persisted cache could not be read or written
    #[error("Cache error for {path}: {message}")]
    Cache { path: String, message: String },

    /// A run finished but some targets failed
    #[error("{failed} of {total} targets failed in '{command}'")]
    FetchFailures {
        command: String,
        failed: usize,
        total: usize,
    },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a cache error with the offending path.
    pub fn cache(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Cache {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Failure of a single fetch target.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection, DNS, timeout or body read failure
    #[error("Transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx HTTP status
    #[error("Unreachable URL: {url} (status {status})")]
    UnreachableUrl { url: String, status: u16 },

    /// Payload did not parse into the expected shape
    #[error("Decode error for {url}: {message}")]
    Decode { url: String, message: String },

    /// Payload parsed but held no usable record
    #[error("Empty result for {url}: {message}")]
    EmptyResult { url: String, message: String },

    /// No numeric identifier could be derived from the URL
    #[error("ID cannot be parsed from URL {url}: {message}")]
    IdentifierParse { url: String, message: String },

    /// The run was cancelled before this target was fetched
    #[error("Cancelled before fetching {url}")]
    Cancelled { url: String },
}

impl FetchError {
    /// Create a decode error.
    pub fn decode(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an empty-result error.
    pub fn empty(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::EmptyResult {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an identifier parse error.
    pub fn identifier(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::IdentifierParse {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// URL the error refers to.
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. }
            | Self::UnreachableUrl { url, .. }
            | Self::Decode { url, .. }
            | Self::EmptyResult { url, .. }
            | Self::IdentifierParse { url, .. }
            | Self::Cancelled { url } => url,
        }
    }

    /// Whether a retry at the run level could plausibly succeed.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
