//! Full-corpus story clustering.
//!
//! Every run partitions the whole corpus from scratch: clear all group ids,
//! rebuild, persist in one transaction. Not incremental. The O(corpus²)
//! keyword and similarity work is acceptable because runs are periodic batch
//! passes, not real-time (a documented scalability boundary).
//!
//! Candidates are compared against a cluster's primary title only, never
//! against other members. That blocks chains where A matches B and B matches
//! C but A does not match C.

use anyhow::Result;
use tracing::info;

use newswire_common::ItemBrief;

use crate::similarity::{significant_words, token_set_ratio};
use crate::traits::StoryStore;
use crate::vendor::is_vendor_url;

/// Minimum shared significant keywords for a cluster match.
const MIN_SHARED_KEYWORDS: usize = 2;

/// Rebuild story clusters over the whole corpus. Returns the number of
/// multi-member clusters created.
///
/// Fresh group ids start above the highest persisted id, so they cannot
/// collide with ids from a deep-merge pass that the clear did not run under.
pub async fn run_grouper(store: &dyn StoryStore, threshold: u32) -> Result<usize> {
    let items = store.items_by_rank().await?;
    if items.is_empty() {
        return Ok(0);
    }

    // Read before the clear: the new ids must stay above everything that was
    // ever handed out.
    let mut next_group_id = store.max_group_id().await? + 1;

    let clusters = build_clusters(&items, threshold);

    let mut assignments = Vec::new();
    let mut group_count = 0;
    for cluster in &clusters {
        if cluster.len() < 2 {
            continue;
        }
        for member in cluster {
            assignments.push((member.id, next_group_id));
        }
        next_group_id += 1;
        group_count += 1;
    }

    store.replace_all_groups(&assignments).await?;
    info!(items = items.len(), groups = group_count, "Rebuilt story clusters");
    Ok(group_count)
}

/// Partition items into clusters, in the given order. Position 0 of each
/// cluster is the primary.
pub(crate) fn build_clusters(items: &[ItemBrief], threshold: u32) -> Vec<Vec<&ItemBrief>> {
    let mut clusters: Vec<Vec<&ItemBrief>> = Vec::new();

    for item in items {
        let item_words = significant_words(&item.title);

        let mut matched = None;
        for (index, cluster) in clusters.iter().enumerate() {
            let primary = cluster[0];
            let shared = item_words
                .intersection(&significant_words(&primary.title))
                .count();
            if shared >= MIN_SHARED_KEYWORDS
                && token_set_ratio(&item.title, &primary.title) >= threshold
            {
                matched = Some(index);
                break;
            }
        }

        match matched {
            Some(index) => {
                let cluster = &mut clusters[index];
                // Vendor items displace a non-vendor primary; everything else
                // appends, preserving relative order.
                if is_vendor_url(&item.url) && !is_vendor_url(&cluster[0].url) {
                    cluster.insert(0, item);
                } else {
                    cluster.push(item);
                }
            }
            None => clusters.push(vec![item]),
        }
    }

    clusters
}
