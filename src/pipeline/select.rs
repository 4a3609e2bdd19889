// src/pipeline/select.rs

//! Cache-diff selection of the targets fetched in one run.
//!
//! Only candidates whose id is absent from the cache are fetched, and at most
//! `chunk_size` of them per run. A large backlog is thus worked off over
//! several runs, each of which can be interrupted and resumed safely.

use std::collections::HashSet;

use crate::models::{FetchTarget, Keyed};
use crate::storage::Cache;

/// Pick up to `chunk_size` candidates not present in `cache`.
///
/// Candidate order is preserved. A candidate id listed twice is selected
/// once. `chunk_size == 0` yields an empty plan.
pub fn select_fresh<T: Keyed>(
    candidates: &[FetchTarget],
    cache: &Cache<T>,
    chunk_size: usize,
) -> Vec<FetchTarget> {
    let mut seen = HashSet::new();

    candidates
        .iter()
        .filter(|candidate| !cache.contains(candidate.id))
        .filter(|candidate| seen.insert(candidate.id))
        .take(chunk_size)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(ids: &[u64]) -> Vec<FetchTarget> {
        ids.iter()
            .map(|id| FetchTarget::new(*id, format!("https://example.com/lookup?id={id}")))
            .collect()
    }

    fn cache(ids: &[u64]) -> Cache<FetchTarget> {
        candidates(ids).into_iter().collect()
    }

    fn ids(plan: &[FetchTarget]) -> Vec<u64> {
        plan.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_select_skips_cached_and_respects_chunk() {
        let plan = select_fresh(&candidates(&[1, 2, 3, 4, 5]), &cache(&[1, 2]), 2);
        assert_eq!(ids(&plan), vec![3, 4]);
    }

    #[test]
    fn test_select_is_stable() {
        let all = candidates(&[9, 4, 7, 1, 3]);
        let cached = cache(&[4]);
        assert_eq!(select_fresh(&all, &cached, 3), select_fresh(&all, &cached, 3));
        assert_eq!(ids(&select_fresh(&all, &cached, 3)), vec![9, 7, 1]);
    }

    #[test]
    fn test_select_zero_chunk_is_empty() {
        let plan = select_fresh(&candidates(&[1, 2, 3]), &cache(&[]), 0);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_select_excludes_every_cached_id() {
        let all = candidates(&(1..=50).collect::<Vec<_>>());
        let cached_ids: Vec<u64> = (1..=50).filter(|id| id % 4 == 0).collect();
        let cached = cache(&cached_ids);

        for chunk in [0, 1, 5, 20, 100] {
            let plan = select_fresh(&all, &cached, chunk);
            assert!(plan.len() <= chunk);
            assert!(plan.iter().all(|t| !cached.contains(t.id)));
        }
    }

    #[test]
    fn test_select_deduplicates_candidates() {
        let plan = select_fresh(&candidates(&[3, 3, 4]), &cache(&[]), 10);
        assert_eq!(ids(&plan), vec![3, 4]);
    }

    #[test]
    fn test_select_everything_cached() {
        let plan = select_fresh(&candidates(&[1, 2]), &cache(&[1, 2]), 10);
        assert!(plan.is_empty());
    }
}
