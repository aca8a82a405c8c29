//! Field extraction from post HTML.
//!
//! Pure functions from one HTML document to a [`PostPatch`] of directly
//! observable fields. WordPress themes vary wildly, so every probe here is
//! best-effort: an ordered list of selectors is tried and the first hit
//! wins, malformed values are swallowed and the field stays absent.
//!
//! Inference (group/system/campaign) happens downstream; this module never
//! touches reference data.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;

use crate::types::PostPatch;

lazy_static! {
    // Matches: Duration: 2:08:54 OR Duration: 48:12
    static ref DURATION_RE: Regex =
        Regex::new(r"(?i)Duration:\s*([0-9]{1,2}:[0-9]{2}(?::[0-9]{2})?)").unwrap();
    // Matches: — 69.6MB or - 69.6MB
    static ref SIZE_RE: Regex = Regex::new(r"(?i)[—-]\s*([0-9.]+)\s*(KB|MB|GB)\b").unwrap();
}

/// Tag/category selectors, tried across themes in order.
const TAG_SELECTORS: &[&str] = &[
    ".cat-links a",
    ".tags-links a",
    "a[rel='category tag']",
    ".post-meta a",
    ".entry-meta a",
    ".td-post-category a",
    ".td-post-source-tags a",
];

/// Author markers: explicit rel first, then conventional containers.
const AUTHOR_SELECTORS: &[&str] = &["a[rel~='author']", ".author a", ".entry-author a"];

/// Navigation/platform labels that show up in tag lists but are not tags.
const TAG_DENYLIST: &[&str] = &[
    "download",
    "play",
    "rss",
    "spotify",
    "apple podcasts",
    "amazon music",
    "pandora",
    "iheartradio",
    "podchaser",
    "tunein",
];

/// Extract all directly observable fields from a post page.
///
/// Never fails: anything that doesn't parse is simply left absent.
pub fn extract(html: &str) -> PostPatch {
    let document = Html::parse_document(html);
    let mut patch = PostPatch::default();

    patch.title = extract_title(&document);
    patch.published_at = extract_published_at(&document);
    patch.author = extract_author(&document);
    patch.tags = extract_tags(&document);

    if let Some(download) = find_download_anchor(&document) {
        patch.download_url = download
            .value()
            .attr("href")
            .map(|href| href.trim().to_string());

        // Duration and file size live in the text around the download
        // link ("Duration: 2:08:54 — 69.6MB").
        let container_text = download
            .parent()
            .and_then(ElementRef::wrap)
            .map(|parent| element_text(&parent))
            .unwrap_or_else(|| page_text_of(&document));

        if let Some(cap) = DURATION_RE.captures(&container_text) {
            patch.duration_seconds = hms_to_seconds(&cap[1]);
            if patch.duration_seconds.is_some() {
                patch.duration_source = Some("wp_html".to_string());
            }
        }
        if let Some(cap) = SIZE_RE.captures(&container_text) {
            if let Ok(num) = cap[1].parse::<f64>() {
                patch.file_size_bytes = Some(size_to_bytes(num, &cap[2]));
            }
        }
    }

    patch.youtube_urls = extract_youtube_urls(&document);

    patch
}

/// Whole-document visible text, whitespace-normalized. Used as the
/// weight-1 haystack for entity inference.
pub fn page_text(html: &str) -> String {
    page_text_of(&Html::parse_document(html))
}

/// Convert an `H:MM:SS` or `M:SS` string to whole seconds.
///
/// Anything other than two or three colon-separated numeric parts is
/// malformed and yields `None`.
pub fn hms_to_seconds(s: &str) -> Option<i32> {
    let parts: Vec<i32> = s
        .split(':')
        .map(|p| p.trim().parse::<i32>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [m, sec] => Some(m * 60 + sec),
        [h, m, sec] => Some(h * 3600 + m * 60 + sec),
        _ => None,
    }
}

/// Convert a size number + unit to bytes, truncated to an integer.
pub fn size_to_bytes(num: f64, unit: &str) -> i64 {
    let mult: i64 = match unit.to_uppercase().as_str() {
        "KB" => 1024,
        "MB" => 1024 * 1024,
        _ => 1024 * 1024 * 1024,
    };
    (num * mult as f64) as i64
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("h1").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
}

fn extract_published_at(document: &Html) -> Option<DateTime<Utc>> {
    let selector = Selector::parse("time[datetime]").ok()?;
    let raw = document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("datetime"))?;
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn extract_author(document: &Html) -> Option<String> {
    for selector_str in AUTHOR_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(el) = document.select(&selector).next() {
                let text = element_text(&el);
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

fn extract_tags(document: &Html) -> Option<Vec<String>> {
    let mut tags = BTreeSet::new();

    for selector_str in TAG_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for el in document.select(&selector) {
            let text = element_text(&el);
            if text.is_empty() {
                continue;
            }
            let lower = text.to_lowercase();
            if TAG_DENYLIST.contains(&lower.as_str()) {
                continue;
            }
            tags.insert(text);
        }
    }

    if tags.is_empty() {
        None
    } else {
        Some(tags.into_iter().collect())
    }
}

/// First anchor whose visible text is exactly "download" (any case).
fn find_download_anchor<'a>(document: &'a Html) -> Option<ElementRef<'a>> {
    let selector = Selector::parse("a").ok()?;
    document
        .select(&selector)
        .find(|el| element_text(el).eq_ignore_ascii_case("download"))
}

fn extract_youtube_urls(document: &Html) -> Option<Vec<String>> {
    let selector = Selector::parse("iframe").ok()?;
    let urls: BTreeSet<String> = document
        .select(&selector)
        .filter_map(|el| el.value().attr("src"))
        .filter(|src| src.contains("youtube.com") || src.contains("youtu.be"))
        .map(String::from)
        .collect();

    if urls.is_empty() {
        None
    } else {
        Some(urls.into_iter().collect())
    }
}

fn element_text(el: &ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn page_text_of(document: &Html) -> String {
    element_text(&document.root_element())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const POST_HTML: &str = r#"
        <html><body>
          <h1>  Giantslayer Session 16 </h1>
          <time datetime="2023-07-12T18:30:00+00:00">July 12, 2023</time>
          <div class="entry-author"><a href="/u/hal">Hal</a></div>
          <span class="cat-links">
            <a href="/c/1">Giantslayer (The Irregulars)</a>
            <a href="/c/2">Pathfinder</a>
            <a href="/c/3">Play</a>
            <a href="/c/4">RSS</a>
          </span>
          <p>Duration: 2:08:54 — 69.6MB
            <a href="https://cdn.example.com/gs16.mp3">Download</a>
          </p>
          <iframe src="https://www.youtube.com/embed/abc123"></iframe>
          <iframe src="https://www.youtube.com/embed/abc123"></iframe>
          <iframe src="https://vimeo.com/987"></iframe>
        </body></html>
    "#;

    #[test]
    fn extracts_title_author_and_published() {
        let patch = extract(POST_HTML);

        assert_eq!(patch.title.as_deref(), Some("Giantslayer Session 16"));
        assert_eq!(patch.author.as_deref(), Some("Hal"));
        assert_eq!(
            patch.published_at,
            Some(Utc.with_ymd_and_hms(2023, 7, 12, 18, 30, 0).unwrap())
        );
    }

    #[test]
    fn extracts_tags_without_denylisted_labels() {
        let patch = extract(POST_HTML);
        let tags = patch.tags.unwrap();

        assert_eq!(
            tags,
            vec![
                "Giantslayer (The Irregulars)".to_string(),
                "Pathfinder".to_string()
            ]
        );
    }

    #[test]
    fn extracts_download_duration_and_size() {
        let patch = extract(POST_HTML);

        assert_eq!(
            patch.download_url.as_deref(),
            Some("https://cdn.example.com/gs16.mp3")
        );
        assert_eq!(patch.duration_seconds, Some(7734));
        assert_eq!(patch.duration_source.as_deref(), Some("wp_html"));
        assert_eq!(patch.file_size_bytes, Some((69.6f64 * 1024.0 * 1024.0) as i64));
    }

    #[test]
    fn extracts_deduplicated_youtube_embeds() {
        let patch = extract(POST_HTML);
        assert_eq!(
            patch.youtube_urls,
            Some(vec!["https://www.youtube.com/embed/abc123".to_string()])
        );
    }

    #[test]
    fn short_duration_parses_as_minutes_seconds() {
        let html = r#"<p>Duration: 48:12 - 22.1MB <a href="/f.mp3">download</a></p>"#;
        let patch = extract(html);
        assert_eq!(patch.duration_seconds, Some(2892));
    }

    #[test]
    fn four_part_duration_is_rejected() {
        assert_eq!(hms_to_seconds("1:02:03:04"), None);
        assert_eq!(hms_to_seconds("48:12"), Some(2892));
        assert_eq!(hms_to_seconds("2:08:54"), Some(7734));
        assert_eq!(hms_to_seconds("garbage"), None);
    }

    #[test]
    fn size_units_convert_and_truncate() {
        assert_eq!(size_to_bytes(69.6, "MB"), (69.6f64 * 1024.0 * 1024.0) as i64);
        assert_eq!(size_to_bytes(2.0, "KB"), 2048);
        assert_eq!(size_to_bytes(1.5, "gb"), (1.5f64 * 1024.0 * 1024.0 * 1024.0) as i64);
    }

    #[test]
    fn missing_everything_yields_empty_patch() {
        let patch = extract("<html><body><p>nothing here</p></body></html>");
        assert!(patch.is_empty());
    }

    #[test]
    fn malformed_datetime_is_swallowed() {
        let html = r#"<time datetime="not-a-date">whenever</time>"#;
        let patch = extract(html);
        assert!(patch.published_at.is_none());
    }
}
