//! Storage trait for the post backlog.
//!
//! The backlog is a table of [`PostRecord`]s keyed by URL. The batch
//! runner only needs four operations; anything else (reporting, ad hoc
//! queries) goes straight to the backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{PendingPost, PostPatch, PostRecord};

/// Backlog storage keyed by post URL.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Record a URL discovered from the sitemap: insert it, or refresh its
    /// lastmod if it already exists. Never touches harvested fields.
    async fn upsert_discovered(&self, url: &str, lastmod: Option<DateTime<Utc>>) -> Result<()>;

    /// Select up to `limit` records that have never been attempted and
    /// still have enrichable gaps, newest lastmod first (nulls last).
    ///
    /// Attempted records are excluded even when incomplete, so repeated
    /// runs converge instead of retrying permanently-unresolvable posts.
    async fn select_pending(&self, limit: usize) -> Result<Vec<PendingPost>>;

    /// Merge an extraction patch into a record under the fill-if-empty
    /// rule, increment the attempt counter, clear the error text, and
    /// stamp the attempt time.
    async fn apply_patch(&self, url: &str, patch: &PostPatch) -> Result<()>;

    /// Record a failed extraction attempt: increment the attempt counter,
    /// keep the error text, stamp the attempt time. Harvested fields are
    /// untouched.
    async fn mark_error(&self, url: &str, error: &str) -> Result<()>;

    /// Fetch one record by URL.
    async fn get(&self, url: &str) -> Result<Option<PostRecord>>;
}
