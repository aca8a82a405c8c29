//! Sitemap ingestion: seed the backlog with post URLs.
//!
//! WordPress sitemaps are flat `<url><loc>..</loc><lastmod>..</lastmod>`
//! lists; a tolerant regex scan is all the structure we need. Entries are
//! upserted keyed by URL, so re-ingesting the same sitemap only refreshes
//! lastmod stamps.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

use crate::error::{FetchError, FetchResult, Result};
use crate::store::PostStore;

lazy_static! {
    static ref URL_BLOCK_RE: Regex = Regex::new(r"(?s)<url>(.*?)</url>").unwrap();
    static ref LOC_RE: Regex = Regex::new(r"(?s)<loc>\s*(.*?)\s*</loc>").unwrap();
    static ref LASTMOD_RE: Regex = Regex::new(r"(?s)<lastmod>\s*(.*?)\s*</lastmod>").unwrap();
}

/// One `<url>` entry from the sitemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<DateTime<Utc>>,
}

/// Parse a sitemap document into entries. Blocks without a `<loc>` are
/// skipped; a malformed `<lastmod>` leaves the timestamp absent.
pub fn parse_sitemap(xml: &str) -> Vec<SitemapEntry> {
    URL_BLOCK_RE
        .captures_iter(xml)
        .filter_map(|block| {
            let body = block.get(1)?.as_str();
            let loc = LOC_RE.captures(body)?.get(1)?.as_str().trim();
            if loc.is_empty() {
                return None;
            }

            let lastmod = LASTMOD_RE
                .captures(body)
                .and_then(|cap| cap.get(1))
                .and_then(|m| DateTime::parse_from_rfc3339(m.as_str().trim()).ok())
                .map(|dt| dt.with_timezone(&Utc));

            Some(SitemapEntry {
                loc: loc.to_string(),
                lastmod,
            })
        })
        .collect()
}

/// Fetch and parse a sitemap URL.
pub async fn fetch_sitemap(client: &reqwest::Client, url: &str) -> FetchResult<Vec<SitemapEntry>> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    Ok(parse_sitemap(&response.text().await?))
}

/// Ingest a sitemap into the backlog; returns the number of URLs seen.
pub async fn ingest_sitemap<S: PostStore>(
    client: &reqwest::Client,
    store: &S,
    url: &str,
) -> Result<usize> {
    let entries = fetch_sitemap(client, url).await?;

    let mut count = 0;
    for entry in entries {
        store.upsert_discovered(&entry.loc, entry.lastmod).await?;
        count += 1;
        if count % 100 == 0 {
            info!(count, "sitemap ingestion progress");
        }
    }

    info!(url = %url, count, "sitemap ingested");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url>
            <loc>https://example.com/giantslayer-session-16/</loc>
            <lastmod>2023-07-12T18:30:00+00:00</lastmod>
          </url>
          <url>
            <loc> https://example.com/kingmaker-session-44/ </loc>
            <lastmod>not a date</lastmod>
          </url>
          <url>
            <loc>https://example.com/about/</loc>
          </url>
          <url>
            <lastmod>2023-07-12T18:30:00Z</lastmod>
          </url>
        </urlset>
    "#;

    #[test]
    fn parses_loc_and_lastmod() {
        let entries = parse_sitemap(SITEMAP);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].loc, "https://example.com/giantslayer-session-16/");
        assert_eq!(
            entries[0].lastmod,
            Some(Utc.with_ymd_and_hms(2023, 7, 12, 18, 30, 0).unwrap())
        );

        // Malformed lastmod is swallowed, loc is trimmed.
        assert_eq!(entries[1].loc, "https://example.com/kingmaker-session-44/");
        assert_eq!(entries[1].lastmod, None);

        // No lastmod at all.
        assert_eq!(entries[2].lastmod, None);
    }

    #[test]
    fn empty_or_garbage_input_yields_no_entries() {
        assert!(parse_sitemap("").is_empty());
        assert!(parse_sitemap("<html>not a sitemap</html>").is_empty());
    }

    #[tokio::test]
    async fn ingest_upserts_every_entry() {
        use crate::stores::MemoryStore;

        let store = MemoryStore::new();
        for entry in parse_sitemap(SITEMAP) {
            store.upsert_discovered(&entry.loc, entry.lastmod).await.unwrap();
        }

        assert_eq!(store.len(), 3);
        let record = store
            .get("https://example.com/giantslayer-session-16/")
            .await
            .unwrap()
            .unwrap();
        assert!(record.lastmod.is_some());
    }
}
