//! Campaign resolution: derive a campaign name, scrub recording
//! artifacts out of it, and normalize it through the alias map.
//!
//! Inference tries three sources in priority order: a "Campaign (Group)"
//! tag, the URL slug, then the post title. The first two skip ahead when
//! their candidate collides with the system or group name; the title is
//! the last resort, so a title that is just the system name means the post
//! has no usable campaign signal and resolution stops with an explicit
//! absence.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::infer::{paren_phrases, strip_parens};
use crate::reference::AliasMap;

lazy_static! {
    static ref SESSION_NUM_RE: Regex = Regex::new(r"(?i)\bSession\s+\d+\b").unwrap();
    static ref SLUG_SESSION_RE: Regex = Regex::new(r"(?i)-session-\d+/?$").unwrap();
    // Recording artifacts: "Session 44", "Session 03a", "Part 2",
    // "Character Creation", "Sfx", and stray trailing numbering.
    static ref ARTIFACT_RE: Regex = Regex::new(
        r"(?i)\b(session\s*\d+[a-z]?|part\s*\d+|character\s+creation|sfx|\d+[a-z]?)\b"
    )
    .unwrap();
    static ref MULTI_SPACE_RE: Regex = Regex::new(r"\s{2,}").unwrap();
}

/// Names that survive cleanup but can never be a campaign on their own.
const RESERVED_NAMES: &[&str] = &["session", "part"];

/// Separator characters trimmed off candidate edges.
const EDGE_SEPARATORS: &[char] = &[' ', '-', '–', '—', ':'];

/// Best-effort campaign inference; first successful rule wins.
pub fn infer_campaign(
    tags: &[String],
    title: Option<&str>,
    group_name: Option<&str>,
    system_name: Option<&str>,
    url: Option<&str>,
) -> Option<String> {
    let system_low = system_name.map(str::to_lowercase);
    let group_low = group_name.map(str::to_lowercase);

    // 1) Group-scoped tag pattern: "Campaign Name (Group Name)"
    if let Some(group_low) = &group_low {
        for tag in tags {
            let scoped = paren_phrases(tag)
                .iter()
                .any(|p| p.trim().to_lowercase() == *group_low);
            if !scoped {
                continue;
            }

            let cleaned = strip_parens(tag);
            let cleaned_low = cleaned.to_lowercase();

            // "System (Group)" and "Group (Group)" are not campaigns.
            if system_low.as_deref() == Some(cleaned_low.as_str()) {
                continue;
            }
            if cleaned_low == *group_low {
                continue;
            }
            if !cleaned.is_empty() {
                return Some(cleaned);
            }
        }
    }

    // 2) URL slug: "<campaign>-session-123"
    if let Some(from_url) = url.and_then(campaign_from_url) {
        if system_low.as_deref() != Some(from_url.to_lowercase().as_str()) {
            return Some(from_url);
        }
    }

    // 3) Title fallback: strip "Session NNN"
    if let Some(title) = title {
        let candidate = SESSION_NUM_RE.replace_all(title, "");
        let candidate = MULTI_SPACE_RE.replace_all(&candidate, " ");
        let candidate = candidate.trim_matches(EDGE_SEPARATORS);
        if !candidate.is_empty() {
            if system_low.as_deref() == Some(candidate.to_lowercase().as_str()) {
                return None;
            }
            return Some(candidate.to_string());
        }
    }

    None
}

/// Derive a campaign from a URL slug like `.../giantslayer-session-16/`.
pub fn campaign_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let path = parsed.path().trim_matches('/');
    if path.is_empty() {
        return None;
    }

    let slug = path.rsplit('/').next()?.to_lowercase();
    let slug = SLUG_SESSION_RE.replace(slug.trim(), "");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        return None;
    }

    let words: Vec<String> = slug
        .split('-')
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect();
    if words.is_empty() {
        return None;
    }

    Some(words.join(" "))
}

/// Strip recording artifacts out of a campaign candidate.
///
/// "Kingmaker Session 44 2" -> "Kingmaker"
/// "Session 00 Character Creation" -> absent
///
/// A result that is empty, a reserved word, or shorter than 3 characters
/// means everything useful was stripped away.
pub fn clean_campaign(name: &str) -> Option<String> {
    let cleaned = ARTIFACT_RE.replace_all(name, "");
    let cleaned = MULTI_SPACE_RE.replace_all(&cleaned, " ");
    let cleaned = cleaned.trim_matches(EDGE_SEPARATORS);

    if cleaned.is_empty() {
        return None;
    }
    let cleaned_low = cleaned.to_lowercase();
    if RESERVED_NAMES.contains(&cleaned_low.as_str()) {
        return None;
    }
    if cleaned.chars().count() < 3 {
        return None;
    }

    Some(cleaned.to_string())
}

/// Substitute the canonical form from the alias map, if any.
pub fn normalize_campaign(aliases: &AliasMap, name: &str) -> String {
    aliases
        .resolve(name)
        .map(String::from)
        .unwrap_or_else(|| name.to_string())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_scoped_tag_wins() {
        let tags = vec![
            "Pathfinder".to_string(),
            "Giantslayer (The Irregulars)".to_string(),
        ];
        let campaign = infer_campaign(
            &tags,
            Some("Giantslayer Session 16"),
            Some("The Irregulars"),
            Some("Pathfinder"),
            Some("https://example.com/giantslayer-session-16/"),
        );
        assert_eq!(campaign.as_deref(), Some("Giantslayer"));
    }

    #[test]
    fn system_in_group_parens_is_not_a_campaign() {
        // "Pathfinder (The Irregulars)" must not yield "Pathfinder";
        // the URL rule takes over instead.
        let tags = vec!["Pathfinder (The Irregulars)".to_string()];
        let campaign = infer_campaign(
            &tags,
            None,
            Some("The Irregulars"),
            Some("Pathfinder"),
            Some("https://example.com/kingmaker-session-101/"),
        );
        assert_eq!(campaign.as_deref(), Some("Kingmaker"));
    }

    #[test]
    fn url_slug_derivation() {
        assert_eq!(
            campaign_from_url("https://example.com/audio/giantslayer-session-16/").as_deref(),
            Some("Giantslayer")
        );
        assert_eq!(
            campaign_from_url("https://example.com/the-one-ring-session-3").as_deref(),
            Some("The One Ring")
        );
        assert_eq!(campaign_from_url("https://example.com/"), None);
    }

    #[test]
    fn url_matching_system_falls_through_to_title() {
        let campaign = infer_campaign(
            &[],
            Some("Savage Tide Session 9"),
            None,
            Some("Pathfinder"),
            Some("https://example.com/pathfinder-session-9/"),
        );
        assert_eq!(campaign.as_deref(), Some("Savage Tide"));
    }

    #[test]
    fn title_equal_to_system_is_explicit_absence() {
        let campaign = infer_campaign(
            &[],
            Some("Pathfinder Session 10"),
            None,
            Some("Pathfinder"),
            None,
        );
        assert_eq!(campaign, None);
    }

    #[test]
    fn no_signal_at_all_is_absent() {
        assert_eq!(infer_campaign(&[], None, None, None, None), None);
    }

    #[test]
    fn cleanup_strips_session_artifacts() {
        assert_eq!(
            clean_campaign("Kingmaker Session 44 2").as_deref(),
            Some("Kingmaker")
        );
        assert_eq!(
            clean_campaign("The One Ring Session 03a").as_deref(),
            Some("The One Ring")
        );
        assert_eq!(clean_campaign("Session 00 Character Creation"), None);
    }

    #[test]
    fn cleanup_rejects_reserved_and_short_names() {
        assert_eq!(clean_campaign("Session"), None);
        assert_eq!(clean_campaign("Part"), None);
        assert_eq!(clean_campaign("Oz Session 12"), None); // 2 chars left
        assert_eq!(clean_campaign("Sfx Part 2"), None);
    }

    #[test]
    fn alias_normalization_is_case_insensitive() {
        let aliases = AliasMap::from_pairs([("rotrl", "Rise of the Runelords")]);
        assert_eq!(
            normalize_campaign(&aliases, "RotRL"),
            "Rise of the Runelords"
        );
        assert_eq!(normalize_campaign(&aliases, "Kingmaker"), "Kingmaker");
    }
}
