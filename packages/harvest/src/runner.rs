//! The resumable batch extraction loop.
//!
//! One invocation drives select → fetch → extract → merge over the
//! backlog, strictly one record at a time. Per-item fetch failures are
//! recorded against the record and never abort the batch; only storage
//! failures (and the configured stop conditions) end the loop. Because
//! every attempt stamps the record's bookkeeping, re-running against an
//! already-attempted backlog selects nothing and is a no-op.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::campaign;
use crate::error::Result;
use crate::extract;
use crate::fetch::PageFetcher;
use crate::infer;
use crate::reference::ReferenceData;
use crate::store::PostStore;
use crate::types::{PostPatch, RunnerConfig};

/// Cumulative counts for one runner invocation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Batches that selected at least one record.
    pub batches: usize,
    /// Records attempted (success or failure).
    pub processed: usize,
    /// Records whose extraction succeeded and was merged.
    pub updated: usize,
    /// Records whose fetch failed and was recorded.
    pub failed: usize,
}

/// Run one page through the whole pipeline: field extraction, group and
/// system inference, campaign resolution + cleanup + alias normalization.
pub fn enrich(html: &str, url: &str, refs: &ReferenceData) -> PostPatch {
    let mut patch = extract::extract(html);
    let text = extract::page_text(html);

    let tags = patch.tags.as_deref().unwrap_or(&[]);
    patch.group_name = infer::infer_group(&refs.groups, tags, &text);
    patch.system_name = infer::infer_system(&refs.systems, tags, &text);

    let raw = campaign::infer_campaign(
        tags,
        patch.title.as_deref(),
        patch.group_name.as_deref(),
        patch.system_name.as_deref(),
        Some(url),
    );
    patch.campaign_name = raw
        .as_deref()
        .and_then(campaign::clean_campaign)
        .map(|name| campaign::normalize_campaign(&refs.campaign_aliases, &name));

    patch
}

/// Drives batched extraction over a [`PostStore`] backlog.
pub struct BatchRunner<'a, S, F> {
    store: &'a S,
    fetcher: &'a F,
    refs: &'a ReferenceData,
    config: RunnerConfig,
}

impl<'a, S: PostStore, F: PageFetcher> BatchRunner<'a, S, F> {
    pub fn new(store: &'a S, fetcher: &'a F, refs: &'a ReferenceData, config: RunnerConfig) -> Self {
        Self {
            store,
            fetcher,
            refs,
            config,
        }
    }

    /// Run batches until a stop condition is reached: empty selection,
    /// the total-records cap, or the batch-count cap, whichever comes
    /// first.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        loop {
            if let Some(max) = self.config.max_batches {
                if summary.batches >= max {
                    break;
                }
            }

            let mut limit = self.config.batch_size;
            if let Some(cap) = self.config.max_posts {
                let remaining = cap.saturating_sub(summary.processed);
                if remaining == 0 {
                    break;
                }
                limit = limit.min(remaining);
            }

            let batch = self.store.select_pending(limit).await?;
            if batch.is_empty() {
                // Backlog exhausted: terminal success.
                break;
            }

            summary.batches += 1;
            info!(
                batch = summary.batches,
                selected = batch.len(),
                "processing extraction batch"
            );

            for post in &batch {
                self.process_one(&post.url, &mut summary).await?;

                // Politeness toward the source server, success or failure.
                if self.config.delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.config.delay_ms)).await;
                }
            }
        }

        info!(
            batches = summary.batches,
            processed = summary.processed,
            updated = summary.updated,
            failed = summary.failed,
            "extraction run complete"
        );
        Ok(summary)
    }

    async fn process_one(&self, url: &str, summary: &mut RunSummary) -> Result<()> {
        summary.processed += 1;

        match self.fetcher.fetch(url).await {
            Ok(html) => {
                let patch = enrich(&html, url, self.refs);
                self.store.apply_patch(url, &patch).await?;
                summary.updated += 1;
            }
            Err(e) => {
                warn!(url = %url, error = %e, "page fetch failed");
                self.store.mark_error(url, &e.to_string()).await?;
                summary.failed += 1;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::testing::MockFetcher;

    const PAGE: &str = r#"
        <html><body>
          <h1>Kingmaker Session 44</h1>
          <p>Duration: 48:12 - 22.1MB <a href="/k44.mp3">Download</a></p>
        </body></html>
    "#;

    fn config() -> RunnerConfig {
        RunnerConfig::new().with_delay_ms(0).until_empty()
    }

    async fn seeded_store(urls: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for url in urls {
            store.upsert_discovered(url, None).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn empty_backlog_is_a_noop() {
        let store = MemoryStore::new();
        let fetcher = MockFetcher::new();
        let refs = ReferenceData::empty();

        let summary = BatchRunner::new(&store, &fetcher, &refs, config())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.batches, 0);
        assert_eq!(summary.processed, 0);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn batch_count_cap_stops_the_loop() {
        let urls = ["https://e.com/a", "https://e.com/b", "https://e.com/c"];
        let store = seeded_store(&urls).await;
        let fetcher = MockFetcher::new()
            .with_page(urls[0], PAGE)
            .with_page(urls[1], PAGE)
            .with_page(urls[2], PAGE);
        let refs = ReferenceData::empty();

        let cfg = config().with_batch_size(2).with_max_batches(1);
        let summary = BatchRunner::new(&store, &fetcher, &refs, cfg)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.batches, 1);
        assert_eq!(summary.processed, 2);
    }

    #[tokio::test]
    async fn total_processed_cap_stops_the_loop() {
        let urls = [
            "https://e.com/a",
            "https://e.com/b",
            "https://e.com/c",
            "https://e.com/d",
            "https://e.com/e",
        ];
        let store = seeded_store(&urls).await;
        let mut fetcher = MockFetcher::new();
        for url in urls {
            fetcher = fetcher.with_page(url, PAGE);
        }
        let refs = ReferenceData::empty();

        let cfg = config().with_batch_size(2).with_max_posts(3);
        let summary = BatchRunner::new(&store, &fetcher, &refs, cfg)
            .run()
            .await
            .unwrap();

        // Two full batches would be 4; the cap trims the second to one.
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.batches, 2);
    }

    #[tokio::test]
    async fn second_run_selects_nothing() {
        let urls = ["https://e.com/a", "https://e.com/b"];
        let store = seeded_store(&urls).await;
        let fetcher = MockFetcher::new()
            .with_page(urls[0], PAGE)
            .with_page(urls[1], PAGE);
        let refs = ReferenceData::empty();

        let first = BatchRunner::new(&store, &fetcher, &refs, config())
            .run()
            .await
            .unwrap();
        assert_eq!(first.processed, 2);
        assert_eq!(first.updated, 2);

        let second = BatchRunner::new(&store, &fetcher, &refs, config())
            .run()
            .await
            .unwrap();
        assert_eq!(second.processed, 0);
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let urls = ["https://e.com/broken", "https://e.com/ok"];
        let store = seeded_store(&urls).await;
        let fetcher = MockFetcher::new()
            .with_failure(urls[0], 500)
            .with_page(urls[1], PAGE);
        let refs = ReferenceData::empty();

        let summary = BatchRunner::new(&store, &fetcher, &refs, config())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failed, 1);

        let broken = store.get(urls[0]).await.unwrap().unwrap();
        assert_eq!(broken.extract_attempts, 1);
        assert_eq!(broken.last_extract_error.as_deref(), Some("HTTP 500 for https://e.com/broken"));

        let ok = store.get(urls[1]).await.unwrap().unwrap();
        assert_eq!(ok.duration_seconds, Some(2892));
        assert_eq!(ok.last_extract_error, None);
    }

    #[test]
    fn enrich_composes_extraction_and_inference() {
        use crate::reference::{AliasMap, NameList};

        let refs = ReferenceData {
            groups: NameList::from_names(["The Irregulars"]),
            systems: NameList::from_names(["Pathfinder"]),
            campaign_aliases: AliasMap::from_pairs([("kingmaker", "Kingmaker AP")]),
        };
        let html = r#"
            <html><body>
              <h1>Kingmaker Session 44</h1>
              <span class="cat-links">
                <a href="/c/1">Kingmaker (The Irregulars)</a>
                <a href="/c/2">Pathfinder</a>
              </span>
            </body></html>
        "#;

        let patch = enrich(html, "https://e.com/kingmaker-session-44/", &refs);

        assert_eq!(patch.group_name.as_deref(), Some("The Irregulars"));
        assert_eq!(patch.system_name.as_deref(), Some("Pathfinder"));
        // Tag rule finds "Kingmaker", cleanup keeps it, alias map renames.
        assert_eq!(patch.campaign_name.as_deref(), Some("Kingmaker AP"));
    }
}
