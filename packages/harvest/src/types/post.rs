//! Post records and extraction patches.
//!
//! A [`PostRecord`] is one discovered post page, keyed by URL. It is
//! created bare (URL + lastmod) when the sitemap is ingested and enriched
//! by extraction attempts over time. A [`PostPatch`] is the output of one
//! extraction attempt; it has no identity of its own and is merged into
//! the record under the fill-if-empty rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post row as selected for extraction: just enough to fetch it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPost {
    pub url: String,
    pub lastmod: Option<DateTime<Utc>>,
}

/// One discovered post page and everything harvested about it so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostRecord {
    /// Canonical page URL; the record's identity.
    pub url: String,

    /// Last-modified timestamp reported by the sitemap.
    pub lastmod: Option<DateTime<Utc>>,

    pub title: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,

    /// Organization/channel that produced the recording.
    pub group_name: Option<String>,
    /// Tabletop game system played.
    pub system_name: Option<String>,
    /// Story arc the session belongs to.
    pub campaign_name: Option<String>,

    pub duration_seconds: Option<i32>,
    /// Where the duration came from (e.g. "wp_html").
    pub duration_source: Option<String>,
    pub download_url: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub youtube_urls: Option<Vec<String>>,

    /// Extraction bookkeeping.
    pub extract_attempts: i32,
    pub last_extract_error: Option<String>,
    pub extracted_at: Option<DateTime<Utc>>,
}

impl PostRecord {
    /// Create a bare record as discovered from the sitemap.
    pub fn new(url: impl Into<String>, lastmod: Option<DateTime<Utc>>) -> Self {
        Self {
            url: url.into(),
            lastmod,
            ..Default::default()
        }
    }

    /// True if this record still has enrichable gaps worth an extraction
    /// attempt.
    pub fn needs_extraction(&self) -> bool {
        self.duration_seconds.is_none()
            || is_empty(&self.tags)
            || is_blank(&self.author)
            || is_blank(&self.group_name)
            || is_blank(&self.system_name)
            || is_blank(&self.campaign_name)
    }

    /// Merge a patch under the fill-if-empty rule: a patch value only
    /// lands in a field that is currently empty/absent. A patch that is
    /// all-absent leaves the record byte-for-byte unchanged.
    ///
    /// Bookkeeping (attempt counter, error text, extracted-at stamp) is
    /// the store's job, not the merge's.
    pub fn fill_from(&mut self, patch: &PostPatch) {
        fill_text(&mut self.title, &patch.title);
        fill_text(&mut self.author, &patch.author);
        fill(&mut self.published_at, &patch.published_at);
        fill_list(&mut self.tags, &patch.tags);
        fill_text(&mut self.group_name, &patch.group_name);
        fill_text(&mut self.system_name, &patch.system_name);
        fill_text(&mut self.campaign_name, &patch.campaign_name);
        fill(&mut self.duration_seconds, &patch.duration_seconds);
        fill_text(&mut self.duration_source, &patch.duration_source);
        fill_text(&mut self.download_url, &patch.download_url);
        fill(&mut self.file_size_bytes, &patch.file_size_bytes);
        fill_list(&mut self.youtube_urls, &patch.youtube_urls);
    }
}

/// The output of one extraction attempt over one page: every enrichable
/// [`PostRecord`] field, all optional. Discarded after merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,

    pub group_name: Option<String>,
    pub system_name: Option<String>,
    pub campaign_name: Option<String>,

    pub duration_seconds: Option<i32>,
    pub duration_source: Option<String>,
    pub download_url: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub youtube_urls: Option<Vec<String>>,
}

impl PostPatch {
    /// True if this patch carries nothing at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.published_at.is_none()
            && self.tags.is_none()
            && self.group_name.is_none()
            && self.system_name.is_none()
            && self.campaign_name.is_none()
            && self.duration_seconds.is_none()
            && self.duration_source.is_none()
            && self.download_url.is_none()
            && self.file_size_bytes.is_none()
            && self.youtube_urls.is_none()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::is_empty).unwrap_or(true)
}

fn is_empty(value: &Option<Vec<String>>) -> bool {
    value.as_deref().map(<[String]>::is_empty).unwrap_or(true)
}

fn fill<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
    if dst.is_none() {
        if let Some(v) = src {
            *dst = Some(v.clone());
        }
    }
}

/// Text fields treat empty strings as absent on both sides, so an empty
/// incoming string never blocks a later backfill and never erases data.
fn fill_text(dst: &mut Option<String>, src: &Option<String>) {
    if is_blank(dst) {
        if let Some(v) = src {
            if !v.is_empty() {
                *dst = Some(v.clone());
            }
        }
    }
}

fn fill_list(dst: &mut Option<Vec<String>>, src: &Option<Vec<String>>) {
    if is_empty(dst) {
        if let Some(v) = src {
            if !v.is_empty() {
                *dst = Some(v.clone());
            }
        }
    }
}
