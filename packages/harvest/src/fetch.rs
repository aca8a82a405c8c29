//! Page fetching behind a trait seam so the batch runner can be tested
//! without a network.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{FetchError, FetchResult};

/// Fetches the raw HTML of one page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<String>;
}

/// HTTP fetcher: one GET per page, redirects followed, bounded timeout.
///
/// A non-2xx status is a failure for that page only; the caller records it
/// and moves on.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Create a fetcher with default settings (30s timeout, up to 5
    /// redirects).
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a fetcher with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent("tabletally/0.1 (metadata harvester)")
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    /// Use a preconfigured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        tracing::debug!(url = %url, "fetching page");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
