// src/models/catalog.rs

//! Podcast catalog entities persisted between runs.

use serde::{Deserialize, Serialize};

use crate::models::Keyed;

/// A podcast genre discovered on the genre index page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
    pub url: String,
}

/// A show discovered on a genre page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    pub id: u64,
    pub name: String,
    pub url: String,
}

/// Show record returned by the lookup API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShowDetails {
    pub id: u64,
    pub name: String,
    pub artist: String,
    /// RSS feed URL, empty when the show publishes none
    #[serde(default)]
    pub rss: String,
    /// Genre ids as reported by the API (strings)
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub image: ShowImage,
}

/// Artwork URLs at 30, 60 and 100 pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShowImage {
    pub small: String,
    pub medium: String,
    pub big: String,
}

/// Data read from a show's RSS channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Feed {
    pub id: u64,
    /// Primary language subtag, lowercased ("en-US" becomes "en")
    pub language: String,
    pub description: String,
    pub last_podcast: Podcast,
}

/// Most recent episode of a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Podcast {
    pub title: String,
    pub published: String,
    pub description: String,
}

/// Flattened show record joining shows, details, feeds and genres.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CompactShow {
    pub id: u64,
    pub show_url: String,
    pub feed_url: String,
    pub name: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub genres: Vec<String>,
    pub image: CompactImage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CompactImage {
    pub xl: String,
    pub xs: String,
    pub md: String,
}

macro_rules! impl_keyed {
    ($($ty:ty),*) => {
        $(impl Keyed for $ty {
            fn id(&self) -> u64 {
                self.id
            }
        })*
    };
}

impl_keyed!(Genre, Show, ShowDetails, Feed, CompactShow);
