//! Typed errors for the harvest library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on failure modes. Per-item fetch failures are recorded against the
//! record's bookkeeping and never abort a batch; only storage-level
//! failures propagate out of the runner.

use thiserror::Error;

/// Errors that can occur while harvesting post metadata.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Page fetch failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl HarvestError {
    /// Wrap a storage backend error.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(err))
    }
}

impl From<sqlx::Error> for HarvestError {
    fn from(err: sqlx::Error) -> Self {
        Self::storage(err)
    }
}

/// Errors that can occur fetching a single page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP transport failure (connect, timeout, TLS, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response status
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },
}

/// Result type alias for harvest operations.
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
