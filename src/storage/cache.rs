// src/storage/cache.rs

//! Id-keyed cache of previously fetched entities.

use std::collections::HashSet;

use crate::models::Keyed;

/// Entities fetched by earlier runs, unique per id.
///
/// Entries keep their insertion order so the persisted file stays stable
/// from run to run. The cache only grows: merging never replaces an entry.
#[derive(Debug, Clone)]
pub struct Cache<T> {
    entries: Vec<T>,
    ids: HashSet<u64>,
}

impl<T: Keyed> Cache<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Build a cache from persisted entries, dropping repeated ids.
    pub fn from_entries(entries: Vec<T>) -> Self {
        let mut cache = Self::new();
        cache.merge(entries);
        cache
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<T> {
        self.entries
    }

    /// Add fresh entities whose id is not cached yet.
    ///
    /// Returns the number of entries added. Merging the same entities twice
    /// adds nothing the second time.
    pub fn merge(&mut self, fresh: impl IntoIterator<Item = T>) -> usize {
        let before = self.entries.len();
        for entity in fresh {
            if self.ids.insert(entity.id()) {
                self.entries.push(entity);
            }
        }
        self.entries.len() - before
    }
}

impl<T: Keyed> Default for Cache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed> FromIterator<T> for Cache<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut cache = Self::new();
        cache.merge(iter);
        cache
    }
}

impl<T: PartialEq> PartialEq for Cache<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

/// Union of `cache` and `fresh`, keyed by id.
pub fn merge<T: Keyed>(mut cache: Cache<T>, fresh: Vec<T>) -> Cache<T> {
    cache.merge(fresh);
    cache
}
