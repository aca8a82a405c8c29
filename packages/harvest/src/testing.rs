//! Testing utilities: mock implementations for network-free tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{FetchError, FetchResult};
use crate::fetch::PageFetcher;

/// A mock page fetcher returning canned HTML (or canned failures) per URL.
///
/// Unknown URLs come back as HTTP 404 so tests exercise the same failure
/// path as a dead link in production.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    failures: HashMap<String, u16>,
    calls: RwLock<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve this HTML for a URL.
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Fail this URL with an HTTP status.
    pub fn with_failure(mut self, url: impl Into<String>, status: u16) -> Self {
        self.failures.insert(url.into(), status);
        self
    }

    /// URLs fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        self.calls.write().unwrap().push(url.to_string());

        if let Some(status) = self.failures.get(url) {
            return Err(FetchError::Status {
                status: *status,
                url: url.to_string(),
            });
        }
        match self.pages.get(url) {
            Some(html) => Ok(html.clone()),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}
