//! Storage abstractions for catalog persistence.
//!
//! Every catalog file is a JSON array of entities, read entirely into memory
//! and rewritten entirely on save.
//!
//! ## Directory Structure
//!
//! ```text
//! {output_dir}/
//! ├── genres.json           # Genres from the index page
//! ├── shows.json            # Shows from genre pages
//! ├── shows.details.json    # Lookup API records (chunked, rate-limited)
//! ├── shows.feed.json       # RSS channel data
//! └── shows.compact.json    # Joined view of all of the above
//! ```

pub mod cache;
pub mod local;

use std::path::Path;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{AppError, Result};
use crate::models::Keyed;

// Re-export for convenience
pub use cache::{Cache, merge};
pub use local::LocalStorage;

pub const GENRES_FILE: &str = "genres.json";
pub const SHOWS_FILE: &str = "shows.json";
pub const DETAILS_FILE: &str = "shows.details.json";
pub const FEEDS_FILE: &str = "shows.feed.json";
pub const COMPACT_FILE: &str = "shows.compact.json";

/// Trait for catalog storage backends.
#[async_trait]
pub trait CatalogStorage: Send + Sync {
    /// Read a whole file, returning `None` when it does not exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace a whole file.
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Human-readable location of a key, for logs.
    fn location(&self, key: &str) -> String;
}

/// Load a persisted cache. A missing file is an empty cache; a file that
/// cannot be parsed is an error.
pub async fn load_cache<T>(storage: &dyn CatalogStorage, key: &str) -> Result<Cache<T>>
where
    T: Keyed + DeserializeOwned,
{
    let entries = match storage.read_bytes(key).await? {
        Some(bytes) => serde_json::from_slice::<Vec<T>>(&bytes)
            .map_err(|e| AppError::cache(storage.location(key), e))?,
        None => Vec::new(),
    };
    Ok(Cache::from_entries(entries))
}

/// Persist a cache as a JSON array.
pub async fn save_cache<T>(storage: &dyn CatalogStorage, key: &str, cache: &Cache<T>) -> Result<()>
where
    T: Keyed + Serialize,
{
    save_list(storage, key, cache.entries()).await
}

/// Persist a plain list as a JSON array.
pub async fn save_list<T: Serialize>(
    storage: &dyn CatalogStorage,
    key: &str,
    entries: &[T],
) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(entries)?;
    storage.write_bytes(key, &bytes).await
}

/// Load a list that a previous command must have produced.
pub async fn load_required<T: DeserializeOwned>(
    storage: &dyn CatalogStorage,
    key: &str,
) -> Result<Vec<T>> {
    let bytes = storage.read_bytes(key).await?.ok_or_else(|| {
        AppError::cache(storage.location(key), "file does not exist")
    })?;
    serde_json::from_slice(&bytes).map_err(|e| AppError::cache(storage.location(key), e))
}

/// Load a list from an arbitrary file path given on the command line.
pub async fn load_list_from_path<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::cache(path.display().to_string(), "file does not exist"));
        }
        Err(e) => return Err(AppError::Io(e)),
    };
    serde_json::from_slice(&bytes).map_err(|e| AppError::cache(path.display().to_string(), e))
}
