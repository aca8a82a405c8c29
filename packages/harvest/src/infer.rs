//! Entity inference: scoring known group/system names against a page.
//!
//! Tag text carries the strongest signal ("Giantslayer (The Irregulars)"
//! encodes campaign + group; "Pathfinder" names the system outright), so
//! tags and their parenthesized sub-phrases weigh 3 while the full page
//! text weighs 1. The same scorer runs twice per page, once against each
//! reference list.

use lazy_static::lazy_static;
use regex::Regex;

use crate::reference::NameList;

lazy_static! {
    static ref PAREN_RE: Regex = Regex::new(r"\(([^)]+)\)").unwrap();
}

/// Score awarded for a haystack that equals the candidate exactly.
const EXACT_MATCH_SCORE: i32 = 10;
/// Weight of a tag (and each of its parenthesized sub-phrases).
const TAG_WEIGHT: i32 = 3;
/// Weight of the full page text.
const PAGE_TEXT_WEIGHT: i32 = 1;

/// Infer the producing group from tags + page text.
pub fn infer_group(known: &NameList, tags: &[String], page_text: &str) -> Option<String> {
    infer_entity(known, tags, page_text)
}

/// Infer the game system from tags + page text.
pub fn infer_system(known: &NameList, tags: &[String], page_text: &str) -> Option<String> {
    infer_entity(known, tags, page_text)
}

/// Pick the best-scoring candidate name, or `None` when nothing matches.
///
/// Scoring per candidate, over every haystack: +10 when the haystack
/// equals the name case-insensitively, plus the haystack's weight when it
/// contains the name as a substring (an exact match is also a containment,
/// so both bonuses stack). Ties go to the candidate listed first in the
/// reference list, which makes runs deterministic.
pub fn infer_entity(known: &NameList, tags: &[String], page_text: &str) -> Option<String> {
    if known.is_empty() {
        return None;
    }

    let haystacks = build_haystacks(tags, page_text);

    let mut best: Option<(&str, i32)> = None;
    for candidate in known.iter() {
        let candidate_low = candidate.to_lowercase();
        let mut score = 0;
        for (text, weight) in &haystacks {
            if *text == candidate_low {
                score += EXACT_MATCH_SCORE;
            }
            if text.contains(&candidate_low) {
                score += weight;
            }
        }
        // Strictly-greater keeps the first candidate on ties.
        if best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((candidate, score));
        }
    }

    best.filter(|(_, score)| *score > 0)
        .map(|(name, _)| name.to_string())
}

/// Parenthesized sub-phrases of a tag, e.g. "Giantslayer (The Irregulars)"
/// yields "The Irregulars". Used by campaign resolution too.
pub(crate) fn paren_phrases(text: &str) -> Vec<&str> {
    PAREN_RE
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Strip every parenthesized phrase out of a tag.
pub(crate) fn strip_parens(text: &str) -> String {
    PAREN_RE.replace_all(text, "").trim().to_string()
}

fn build_haystacks(tags: &[String], page_text: &str) -> Vec<(String, i32)> {
    let mut haystacks = Vec::new();
    for tag in tags {
        haystacks.push((tag.to_lowercase(), TAG_WEIGHT));
        for phrase in paren_phrases(tag) {
            haystacks.push((phrase.to_lowercase(), TAG_WEIGHT));
        }
    }
    if !page_text.is_empty() {
        haystacks.push((page_text.to_lowercase(), PAGE_TEXT_WEIGHT));
    }
    haystacks
}
