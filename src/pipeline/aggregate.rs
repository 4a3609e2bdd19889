// src/pipeline/aggregate.rs

//! Splits a result set into entities and errors.

use crate::error::FetchError;
use crate::models::ResultSet;

/// Split results by outcome. Nothing is dropped:
/// `entities.len() + errors.len() == results.len()`.
pub fn aggregate<T>(results: ResultSet<T>) -> (Vec<T>, Vec<FetchError>) {
    let mut entities = Vec::with_capacity(results.len());
    let mut errors = Vec::new();

    for result in results {
        match result.outcome {
            Ok(entity) => entities.push(entity),
            Err(error) => errors.push(error),
        }
    }

    (entities, errors)
}
