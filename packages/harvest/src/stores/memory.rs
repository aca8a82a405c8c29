//! In-memory backlog for testing and development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;
use crate::store::PostStore;
use crate::types::{PendingPost, PostPatch, PostRecord};

/// In-memory post backlog. Data is lost on drop; not for production.
#[derive(Default)]
pub struct MemoryStore {
    posts: RwLock<HashMap<String, PostRecord>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in the backlog.
    pub fn len(&self) -> usize {
        self.posts.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.read().unwrap().is_empty()
    }

    /// Insert a fully-formed record (test seeding).
    pub fn insert(&self, record: PostRecord) {
        self.posts
            .write()
            .unwrap()
            .insert(record.url.clone(), record);
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn upsert_discovered(&self, url: &str, lastmod: Option<DateTime<Utc>>) -> Result<()> {
        let mut posts = self.posts.write().unwrap();
        posts
            .entry(url.to_string())
            .and_modify(|record| record.lastmod = lastmod)
            .or_insert_with(|| PostRecord::new(url, lastmod));
        Ok(())
    }

    async fn select_pending(&self, limit: usize) -> Result<Vec<PendingPost>> {
        let posts = self.posts.read().unwrap();
        let mut pending: Vec<&PostRecord> = posts
            .values()
            .filter(|r| r.extracted_at.is_none() && r.needs_extraction())
            .collect();

        // lastmod DESC, nulls last; URL as a deterministic final key.
        pending.sort_by(|a, b| match (&b.lastmod, &a.lastmod) {
            (Some(x), Some(y)) => x.cmp(y).then_with(|| a.url.cmp(&b.url)),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (None, None) => a.url.cmp(&b.url),
        });

        Ok(pending
            .into_iter()
            .take(limit)
            .map(|r| PendingPost {
                url: r.url.clone(),
                lastmod: r.lastmod,
            })
            .collect())
    }

    async fn apply_patch(&self, url: &str, patch: &PostPatch) -> Result<()> {
        let mut posts = self.posts.write().unwrap();
        if let Some(record) = posts.get_mut(url) {
            record.fill_from(patch);
            record.extract_attempts += 1;
            record.last_extract_error = None;
            record.extracted_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_error(&self, url: &str, error: &str) -> Result<()> {
        let mut posts = self.posts.write().unwrap();
        if let Some(record) = posts.get_mut(url) {
            record.extract_attempts += 1;
            record.last_extract_error = Some(error.chars().take(2000).collect());
            record.extracted_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Option<PostRecord>> {
        Ok(self.posts.read().unwrap().get(url).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn upsert_refreshes_lastmod_without_touching_fields() {
        let store = MemoryStore::new();
        store
            .upsert_discovered("https://example.com/a", Some(ts(1)))
            .await
            .unwrap();

        let patch = PostPatch {
            title: Some("A Title".to_string()),
            ..Default::default()
        };
        store.apply_patch("https://example.com/a", &patch).await.unwrap();

        store
            .upsert_discovered("https://example.com/a", Some(ts(5)))
            .await
            .unwrap();

        let record = store.get("https://example.com/a").await.unwrap().unwrap();
        assert_eq!(record.lastmod, Some(ts(5)));
        assert_eq!(record.title.as_deref(), Some("A Title"));
    }

    #[tokio::test]
    async fn select_orders_newest_first_with_nulls_last() {
        let store = MemoryStore::new();
        store.upsert_discovered("https://example.com/old", Some(ts(1))).await.unwrap();
        store.upsert_discovered("https://example.com/new", Some(ts(9))).await.unwrap();
        store.upsert_discovered("https://example.com/undated", None).await.unwrap();

        let pending = store.select_pending(10).await.unwrap();
        let urls: Vec<_> = pending.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/new",
                "https://example.com/old",
                "https://example.com/undated"
            ]
        );

        let limited = store.select_pending(1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].url, "https://example.com/new");
    }

    #[tokio::test]
    async fn attempted_records_are_not_reselected() {
        let store = MemoryStore::new();
        store.upsert_discovered("https://example.com/a", None).await.unwrap();

        // A failed attempt still counts as attempted.
        store.mark_error("https://example.com/a", "HTTP 404").await.unwrap();

        assert!(store.select_pending(10).await.unwrap().is_empty());

        let record = store.get("https://example.com/a").await.unwrap().unwrap();
        assert_eq!(record.extract_attempts, 1);
        assert_eq!(record.last_extract_error.as_deref(), Some("HTTP 404"));
        assert!(record.extracted_at.is_some());
    }

    #[tokio::test]
    async fn apply_patch_clears_previous_error() {
        let store = MemoryStore::new();
        store.upsert_discovered("https://example.com/a", None).await.unwrap();
        store.mark_error("https://example.com/a", "timeout").await.unwrap();

        store
            .apply_patch("https://example.com/a", &PostPatch::default())
            .await
            .unwrap();

        let record = store.get("https://example.com/a").await.unwrap().unwrap();
        assert_eq!(record.extract_attempts, 2);
        assert_eq!(record.last_extract_error, None);
    }
}
