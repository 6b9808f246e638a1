mod error;

pub use error::FetchError;

use crate::config::NetworkConfig;
use crate::internal::models::FeedItem;
use crate::internal::normalize::decode_posts;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

/// Anything that can produce the first page of the feed.
///
/// The screen only ever talks to this trait, so tests can swap the HTTP client for a
/// scripted double.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and normalize one page of posts. Does not retry.
    async fn fetch_feed(&self) -> Result<Vec<FeedItem>, FetchError>;
}

/// Fetches the posts listing of a WordPress REST API over HTTP.
#[derive(Clone)]
pub struct FeedClient {
    client: Client,
    api_base: String,
    per_page: u32,
}

impl FeedClient {
    /// Build a client from the network section of the config. The request timeout
    /// is enforced by reqwest at the transport level.
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &NetworkConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            per_page: config.per_page,
        }
    }

    /// `{api_base}/posts`; `per_page` is sent as a query parameter.
    pub fn posts_url(&self) -> String {
        format!("{}/posts", self.api_base)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    #[tracing::instrument(skip(self), fields(per_page = self.per_page))]
    pub async fn fetch_posts(&self) -> Result<Vec<FeedItem>, FetchError> {
        let url = self.posts_url();
        let start = std::time::Instant::now();

        let resp = self
            .client
            .get(&url)
            .query(&[("per_page", self.per_page)])
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(|source| FetchError::Network {
            url: url.clone(),
            source,
        })?;

        let items = decode_posts(&body)?;
        tracing::debug!(elapsed = ?start.elapsed(), count = items.len(), "fetched posts");
        Ok(items)
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch_feed(&self) -> Result<Vec<FeedItem>, FetchError> {
        self.fetch_posts().await
    }
}
