// src/models/mod.rs

//! Domain models for the catalog crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod catalog;
mod config;
mod fetch;
mod report;

// Re-export all public types
pub use catalog::{CompactImage, CompactShow, Feed, Genre, Podcast, Show, ShowDetails, ShowImage};
pub use config::{Config, CrawlerConfig, EndpointsConfig, PathsConfig};
pub use fetch::{FetchResult, FetchTarget, Keyed, ResultSet};
pub use report::RunReport;
