//! Title similarity scoring and keyword extraction.
//!
//! Two scoring modes, both symmetric, both 0-100:
//! - `char_ratio` — edit-distance ratio over the raw (lowercased) strings.
//!   Sensitive to word order and length; the dedup engine's strict mode.
//! - `token_set_ratio` — the same ratio over canonicalized token sets, which
//!   tolerates reordering and repeated words ("X announces Y" vs
//!   "Y announced by X" score near 100 here, much lower under `char_ratio`).

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use rapidfuzz::fuzz;
use regex::Regex;

/// Words too common to signal story identity.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "is", "are", "was", "were", "be", "been", "its", "it", "this", "that", "how", "what",
    "new", "into", "as", "has", "more", "can", "about", "will", "may", "up", "out", "just",
    "than", "introducing", "says", "could", "over", "why", "after",
];

/// Alphanumeric runs, keeping embedded decimals ("4.5") as one token.
static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+(?:\.[0-9]+)*").expect("valid regex"));

/// Character-level similarity ratio between two titles, 0-100.
/// Empty or whitespace-only input scores 0.
pub fn char_ratio(a: &str, b: &str) -> u32 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    (fuzz::ratio(a.chars(), b.chars()) * 100.0).round() as u32
}

/// Word-order-insensitive similarity ratio, 0-100: both titles are reduced to
/// their sorted unique lowercase tokens before the character comparison.
pub fn token_set_ratio(a: &str, b: &str) -> u32 {
    char_ratio(&canonical_token_string(a), &canonical_token_string(b))
}

fn canonical_token_string(title: &str) -> String {
    let lower = title.to_lowercase();
    let tokens: BTreeSet<&str> = lower.split_whitespace().collect();
    tokens.into_iter().collect::<Vec<_>>().join(" ")
}

/// Significant-keyword set of a title: lowercase alphanumeric tokens longer
/// than 3 characters that are not stopwords.
pub fn significant_words(title: &str) -> HashSet<String> {
    let lower = title.to_lowercase();
    WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .filter(|word| word.len() > 3 && !STOPWORDS.contains(&word.as_str()))
        .collect()
}
