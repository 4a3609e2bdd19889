//! Service layer for the catalog crawler.
//!
//! This module contains the fetch machinery:
//! - Single-URL fetching (`Fetcher`) with pluggable `Decoder`s
//! - Concurrent and rate-limited dispatch (`Dispatcher`)
//! - Link scraping and id derivation (`EntityResolver`)

pub mod decoders;
pub mod dispatcher;
pub mod fetcher;
pub mod progress;
pub mod resolver;

#[cfg(test)]
pub(crate) mod test_server;

pub use decoders::{FeedDecoder, LinkDecoder, LookupDecoder};
pub use dispatcher::{Dispatcher, RetryPolicy};
pub use fetcher::{Decoder, Fetcher};
pub use progress::{LogProgress, NoProgress, Progress};
pub use resolver::{EntityResolver, Resolution, ResolvedEntity};
