// src/services/resolver.rs

//! Entity resolver.
//!
//! Scrapes listing pages for links and turns them into catalog entities
//! identified by the numeric id at the end of each link.

use std::collections::{HashMap, HashSet};

use crate::error::{FetchError, Result};
use crate::models::FetchTarget;
use crate::services::decoders::LinkDecoder;
use crate::services::dispatcher::Dispatcher;
use crate::utils::extract_entity_id;

/// A link whose URL yielded a numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntity {
    pub id: u64,
    pub label: String,
    pub url: String,
}

/// Entities resolved from a set of pages, plus every failure on the way.
#[derive(Debug, Default)]
pub struct Resolution {
    pub entities: Vec<ResolvedEntity>,
    pub errors: Vec<FetchError>,
}

/// Resolves links on pages with a CSS selector.
pub struct EntityResolver<'a> {
    dispatcher: &'a Dispatcher,
    decoder: LinkDecoder,
}

impl<'a> EntityResolver<'a> {
    pub fn new(dispatcher: &'a Dispatcher, pattern: &str) -> Result<Self> {
        Ok(Self {
            dispatcher,
            decoder: LinkDecoder::new(pattern)?,
        })
    }

    /// Fetch every page concurrently and collect `label -> url` links.
    ///
    /// Links are returned in page order; when a label appears more than once
    /// the first occurrence wins.
    pub async fn resolve_links(&self, pages: &[FetchTarget]) -> (Vec<(String, String)>, Vec<FetchError>) {
        let results = self.dispatcher.dispatch_all(pages, &self.decoder).await;

        let mut by_page: HashMap<String, Vec<(String, String)>> = HashMap::new();
        let mut errors = Vec::new();
        for result in results {
            match result.outcome {
                Ok(links) => {
                    by_page.insert(result.url, links);
                }
                Err(e) => errors.push(e),
            }
        }

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for page in pages {
            for (label, url) in by_page.remove(&page.url).unwrap_or_default() {
                if seen.insert(label.clone()) {
                    links.push((label, url));
                }
            }
        }

        (links, errors)
    }

    /// Resolve links and derive an id from each one.
    ///
    /// A link without a numeric id is reported as
    /// [`FetchError::IdentifierParse`]; repeated ids keep the first link.
    pub async fn resolve(&self, pages: &[FetchTarget]) -> Resolution {
        let (links, mut errors) = self.resolve_links(pages).await;

        let mut seen = HashSet::new();
        let mut entities = Vec::with_capacity(links.len());
        for (label, url) in links {
            match extract_entity_id(&url) {
                Ok(id) => {
                    if seen.insert(id) {
                        entities.push(ResolvedEntity { id, label, url });
                    }
                }
                Err(e) => errors.push(e),
            }
        }

        log::debug!(
            "Resolved {} entities from {} pages ({} errors)",
            entities.len(),
            pages.len(),
            errors.len()
        );

        Resolution { entities, errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CrawlerConfig;
    use crate::services::test_server::TestServer;

    const GENRE_SELECTOR: &str = ".top-level-genre, .top-level-subgenres a[href]";

    #[tokio::test]
    async fn test_resolve_genre_links() {
        let server = TestServer::start().await;
        let dispatcher = Dispatcher::from_config(&CrawlerConfig::default()).unwrap();
        let resolver = EntityResolver::new(&dispatcher, GENRE_SELECTOR).unwrap();

        let pages = vec![FetchTarget::new(0, server.url("/genres"))];
        let resolution = resolver.resolve(&pages).await;

        let ids: Vec<u64> = resolution.entities.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(resolution.entities[0].label, "Arts");
        assert_eq!(
            resolution.entities[0].url,
            server.url("/genre/podcasts-arts/id1")
        );

        assert_eq!(resolution.errors.len(), 1);
        assert!(matches!(
            resolution.errors[0],
            FetchError::IdentifierParse { .. }
        ));
    }

    #[tokio::test]
    async fn test_resolve_dedups_across_pages_and_keeps_page_errors() {
        let server = TestServer::start().await;
        let dispatcher = Dispatcher::from_config(&CrawlerConfig::default()).unwrap();
        let resolver =
            EntityResolver::new(&dispatcher, "div[id=selectedcontent] .column a[href]").unwrap();

        let pages = vec![
            FetchTarget::new(1, server.url("/genre/podcasts-arts/id1")),
            FetchTarget::new(2, server.url("/genre/podcasts-books/id2")),
            FetchTarget::new(3, server.url("/404")),
        ];
        let resolution = resolver.resolve(&pages).await;

        let ids: Vec<u64> = resolution.entities.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![11, 12, 100, 21, 22]);
        assert_eq!(resolution.errors.len(), 1);
        assert!(matches!(
            resolution.errors[0],
            FetchError::UnreachableUrl { status: 404, .. }
        ));
    }
}
