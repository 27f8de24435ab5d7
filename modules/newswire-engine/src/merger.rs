//! Deep semantic merge pass.
//!
//! Runs less frequently than the cluster rebuild and catches same-story pairs
//! the single-threshold rule misses: pairs whose token-set similarity sits in
//! the dead zone below the grouper's acceptance threshold but above noise.
//! Higher scores are already handled by the grouper, so the band is capped.
//!
//! Confirmed pairs are linked by group_id. When both items already belong to
//! different clusters, only the two items end up sharing an id; the remaining
//! members of their original clusters are left untouched. That non-transitive
//! link is the inherited merge policy (see DESIGN.md), kept as-is.

use anyhow::Result;
use tracing::{info, warn};

use crate::adjudicator::{adjudicate, PairContext, StoryJudge};
use crate::similarity::{significant_words, token_set_ratio};
use crate::traits::StoryStore;
use crate::vendor::is_vendor_url;

/// Scan the whole corpus for dead-zone pairs, adjudicate them, and link the
/// confirmed ones. Returns the number of links applied.
pub async fn deep_merge(
    store: &dyn StoryStore,
    judge: &dyn StoryJudge,
    fuzzy_low: u32,
    fuzzy_high: u32,
    batch_size: usize,
) -> Result<usize> {
    let items = store.items_for_merge().await?;
    if items.len() < 2 {
        return Ok(0);
    }

    let words: Vec<_> = items.iter().map(|item| significant_words(&item.title)).collect();

    let mut candidates = Vec::new();
    for i in 0..items.len() {
        if words[i].is_empty() {
            continue;
        }
        for j in (i + 1)..items.len() {
            if words[i].is_disjoint(&words[j]) {
                continue;
            }
            let score = token_set_ratio(&items[i].title, &items[j].title);
            if score >= fuzzy_low && score <= fuzzy_high {
                candidates.push(PairContext::from_briefs(&items[i], &items[j]));
            }
        }
    }

    if candidates.is_empty() {
        info!("Deep merge: no dead-zone candidate pairs");
        return Ok(0);
    }
    info!(candidates = candidates.len(), "Deep merge: candidate pairs to adjudicate");

    let confirmed = adjudicate(judge, &candidates, batch_size).await;
    if confirmed.is_empty() {
        info!("Deep merge: judge confirmed no pairs");
        return Ok(0);
    }

    let mut next_group_id = store.max_group_id().await? + 1;
    let mut linked = 0;
    for pair in &confirmed {
        if link_confirmed_pair(store, &pair.title_a, &pair.title_b, &mut next_group_id).await? {
            linked += 1;
        }
    }

    info!(linked, "Deep merge complete");
    Ok(linked)
}

/// Link two adjudicator-confirmed titles by group_id.
///
/// Titles are re-resolved against the store at link time; a title with zero
/// or multiple matching rows is an inconsistency and the pair is skipped.
/// Returns whether a link was applied.
pub(crate) async fn link_confirmed_pair(
    store: &dyn StoryStore,
    title_a: &str,
    title_b: &str,
    next_group_id: &mut i64,
) -> Result<bool> {
    let Some(row_a) = find_single(store, title_a).await? else {
        return Ok(false);
    };
    let Some(row_b) = find_single(store, title_b).await? else {
        return Ok(false);
    };
    if row_a.id == row_b.id {
        return Ok(false);
    }
    if let (Some(a), Some(b)) = (row_a.group_id, row_b.group_id) {
        if a == b {
            return Ok(false);
        }
    }

    // One existing id wins; different existing ids link the two rows only,
    // without pulling in either cluster's other members.
    let group_id = match (row_a.group_id, row_b.group_id) {
        (Some(id), _) => id,
        (None, Some(id)) => id,
        (None, None) => {
            let id = *next_group_id;
            *next_group_id += 1;
            id
        }
    };
    store.set_group(row_a.id, group_id).await?;
    store.set_group(row_b.id, group_id).await?;

    promote_vendor_rank(store, &row_a, &row_b).await?;
    Ok(true)
}

async fn find_single(
    store: &dyn StoryStore,
    title: &str,
) -> Result<Option<newswire_common::MergeBrief>> {
    let mut rows = store.find_by_title_lower(&title.trim().to_lowercase()).await?;
    match rows.len() {
        1 => Ok(rows.pop()),
        0 => {
            warn!(title, "Confirmed pair references a title with no stored row, skipping");
            Ok(None)
        }
        n => {
            warn!(title, matches = n, "Confirmed pair references an ambiguous title, skipping");
            Ok(None)
        }
    }
}

/// Sort-by-score is the display order, so when exactly one side of a link is
/// a vendor item it must not rank below the other: swap the two scores if
/// the vendor item's is lower.
async fn promote_vendor_rank(
    store: &dyn StoryStore,
    row_a: &newswire_common::MergeBrief,
    row_b: &newswire_common::MergeBrief,
) -> Result<()> {
    let a_vendor = is_vendor_url(&row_a.url);
    let b_vendor = is_vendor_url(&row_b.url);
    let (vendor, other) = match (a_vendor, b_vendor) {
        (true, false) => (row_a, row_b),
        (false, true) => (row_b, row_a),
        _ => return Ok(()),
    };

    let vendor_score = store.get_score(vendor.id).await?;
    let other_score = store.get_score(other.id).await?;
    if vendor_score < other_score {
        store.set_score(vendor.id, other_score).await?;
        store.set_score(other.id, vendor_score).await?;
    }
    Ok(())
}
