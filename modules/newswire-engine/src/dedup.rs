//! Identity dedup: reduce an incoming batch to unique items given the
//! persisted corpus.
//!
//! Two layers, in order: exact normalized-URL match, then strict fuzzy title
//! match against every title already seen (batch-kept plus historical).
//! Comparisons that land between `borderline_low` and the drop threshold are
//! too close to ignore but not close enough to auto-drop; the single best one
//! per kept candidate is returned for semantic adjudication.
//!
//! Ordering is policy, not accident: the first occurrence of a story in input
//! order becomes canonical, so callers that want history to win must supply
//! historical items first.

use std::collections::HashSet;

use newswire_common::{BorderlinePair, RawNewsItem};

use crate::similarity::char_ratio;
use crate::urlnorm::normalize_url;

#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// Candidates kept, in input order.
    pub unique: Vec<RawNewsItem>,
    /// At most one ambiguous pair per kept candidate, for the adjudicator.
    pub borderline: Vec<BorderlinePair>,
}

/// Resolve a batch of candidates against the persisted corpus.
///
/// `existing_normalized_urls` and `existing_titles` seed the seen sets so
/// dedup stays consistent across runs; titles are expected lowercased.
pub fn resolve(
    candidates: Vec<RawNewsItem>,
    threshold: u32,
    borderline_low: u32,
    existing_normalized_urls: &HashSet<String>,
    existing_titles: &[String],
) -> DedupOutcome {
    let mut seen_urls = existing_normalized_urls.clone();
    let mut seen_titles = existing_titles.to_vec();
    let mut outcome = DedupOutcome::default();

    for item in candidates {
        let norm_url = normalize_url(&item.url);
        if seen_urls.contains(&norm_url) {
            continue;
        }

        let title_lower = item.title.trim().to_lowercase();
        let mut is_duplicate = false;
        let mut best_borderline: Option<BorderlinePair> = None;
        let mut best_score = 0;
        for kept_title in &seen_titles {
            let score = char_ratio(&title_lower, kept_title);
            if score >= threshold {
                is_duplicate = true;
                break;
            }
            if score >= borderline_low && score > best_score {
                best_borderline = Some(BorderlinePair::new(&item.title, kept_title));
                best_score = score;
            }
        }

        if is_duplicate {
            continue;
        }

        if let Some(pair) = best_borderline {
            outcome.borderline.push(pair);
        }

        seen_urls.insert(norm_url);
        seen_titles.push(title_lower);
        outcome.unique.push(item);
    }

    outcome
}
