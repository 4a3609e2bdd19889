// src/services/fetcher.rs

//! Single-URL fetch: GET, status check, body read, decode.

use reqwest::Client;

use crate::error::{FetchError, Result};
use crate::models::{CrawlerConfig, FetchResult};
use crate::utils::http::create_async_client;

/// Turns a response body into a typed entity.
///
/// Decoders are pure: they never perform I/O. A structurally valid but empty
/// payload must be reported as [`FetchError::EmptyResult`], never as a
/// default-valued entity.
pub trait Decoder: Send + Sync {
    type Entity: Send;

    fn decode(&self, url: &str, body: &[u8]) -> std::result::Result<Self::Entity, FetchError>;
}

impl<F, T> Decoder for F
where
    F: Fn(&str, &[u8]) -> std::result::Result<T, FetchError> + Send + Sync,
    T: Send,
{
    type Entity = T;

    fn decode(&self, url: &str, body: &[u8]) -> std::result::Result<T, FetchError> {
        self(url, body)
    }
}

/// Issues one HTTP request per call. Holds no state besides the client.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a fetcher with a client configured from `config`.
    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?))
    }

    /// Fetch `url` and decode the body.
    ///
    /// Non-2xx responses become [`FetchError::UnreachableUrl`]; transport
    /// failures become [`FetchError::Transport`]; decoder errors pass through
    /// unchanged.
    pub async fn fetch<D>(&self, url: &str, decoder: &D) -> FetchResult<D::Entity>
    where
        D: Decoder + ?Sized,
    {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(source) => {
                return FetchResult::failure(
                    url,
                    FetchError::Transport {
                        url: url.to_string(),
                        source,
                    },
                );
            }
        };

        let status = response.status();
        if !status.is_success() {
            return FetchResult::failure(
                url,
                FetchError::UnreachableUrl {
                    url: url.to_string(),
                    status: status.as_u16(),
                },
            );
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(source) => {
                return FetchResult::failure(
                    url,
                    FetchError::Transport {
                        url: url.to_string(),
                        source,
                    },
                );
            }
        };

        FetchResult {
            url: url.to_string(),
            outcome: decoder.decode(url, &body),
        }
    }
}
