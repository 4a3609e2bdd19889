// src/models/fetch.rs

//! Units of work flowing through the fetch pipeline.

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Entities persisted in a cache expose a stable numeric identifier.
pub trait Keyed {
    fn id(&self) -> u64;
}

/// A URL to fetch, identified by the catalog id it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchTarget {
    pub id: u64,
    pub url: String,
}

impl FetchTarget {
    pub fn new(id: u64, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
        }
    }
}

impl Keyed for FetchTarget {
    fn id(&self) -> u64 {
        self.id
    }
}

/// Outcome of fetching and decoding one URL.
#[derive(Debug)]
pub struct FetchResult<T> {
    pub url: String,
    pub outcome: Result<T, FetchError>,
}

impl<T> FetchResult<T> {
    pub fn success(url: impl Into<String>, entity: T) -> Self {
        Self {
            url: url.into(),
            outcome: Ok(entity),
        }
    }

    pub fn failure(url: impl Into<String>, error: FetchError) -> Self {
        Self {
            url: url.into(),
            outcome: Err(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn entity(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.outcome.as_ref().err()
    }
}

/// Results of one dispatcher run, in completion order.
pub type ResultSet<T> = Vec<FetchResult<T>>;
