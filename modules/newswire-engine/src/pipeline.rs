//! One fetch cycle, end to end.
//!
//! Candidates from the extraction collaborators are resolved against the
//! persisted corpus, borderline pairs are adjudicated, unique items are
//! persisted, clusters are rebuilt over the full corpus, and adjudicated
//! same-story pairs are linked afterwards. The linking comes last because the
//! rebuild is clear-then-rebuild and would discard any grouping applied
//! before it.
//!
//! Single-threaded by design: one pipeline invocation owns the corpus until
//! it completes.

use std::collections::HashSet;

use anyhow::Result;
use tracing::info;

use newswire_common::{Config, RawNewsItem};

use crate::adjudicator::{adjudicate, PairContext, StoryJudge};
use crate::dedup::resolve;
use crate::grouper::run_grouper;
use crate::merger::link_confirmed_pair;
use crate::traits::StoryStore;
use crate::urlnorm::normalize_url;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    pub fetched: usize,
    pub unique: usize,
    pub stored: usize,
    pub borderline: usize,
    pub confirmed: usize,
    pub linked: usize,
    pub groups: usize,
}

/// Run one full pass over a batch of candidates.
pub async fn run_pass(
    store: &dyn StoryStore,
    judge: &dyn StoryJudge,
    config: &Config,
    candidates: Vec<RawNewsItem>,
) -> Result<PassStats> {
    let fetched = candidates.len();
    info!(fetched, "Starting pipeline pass");

    // 1. Resolve against the persisted corpus.
    let existing_urls: HashSet<String> = store
        .all_urls()
        .await?
        .iter()
        .map(|url| normalize_url(url))
        .collect();
    let existing_titles = store.all_titles_lower().await?;
    let outcome = resolve(
        candidates,
        config.dedup_threshold,
        config.borderline_low,
        &existing_urls,
        &existing_titles,
    );
    info!(
        unique = outcome.unique.len(),
        borderline = outcome.borderline.len(),
        "Dedup resolved batch"
    );

    // 2. Adjudicate the ambiguous band before anything is persisted.
    let contexts: Vec<PairContext> =
        outcome.borderline.iter().map(PairContext::from_pair).collect();
    let confirmed = adjudicate(judge, &contexts, config.adjudication_batch_size).await;

    // 3. Persist the kept items.
    let mut stored = 0;
    for item in &outcome.unique {
        if store.insert_item(item).await?.is_some() {
            stored += 1;
        }
    }

    // 4. Rebuild story clusters over the full corpus.
    let groups = run_grouper(store, config.group_threshold).await?;

    // 5. Link adjudicated same-story pairs the rebuild did not already join.
    let mut next_group_id = store.max_group_id().await? + 1;
    let mut linked = 0;
    for pair in &confirmed {
        if link_confirmed_pair(store, &pair.title_a, &pair.title_b, &mut next_group_id).await? {
            linked += 1;
        }
    }

    let stats = PassStats {
        fetched,
        unique: outcome.unique.len(),
        stored,
        borderline: outcome.borderline.len(),
        confirmed: confirmed.len(),
        linked,
        groups,
    };
    info!(
        fetched = stats.fetched,
        unique = stats.unique,
        stored = stats.stored,
        borderline = stats.borderline,
        confirmed = stats.confirmed,
        linked = stats.linked,
        groups = stats.groups,
        "Pipeline pass complete"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, MockJudge};

    fn config() -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            anthropic_api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            dedup_threshold: 80,
            borderline_low: 50,
            group_threshold: 60,
            fuzzy_low: 30,
            fuzzy_high: 70,
            adjudication_batch_size: 15,
        }
    }

    fn item(title: &str, url: &str) -> RawNewsItem {
        RawNewsItem {
            title: title.to_string(),
            url: url.to_string(),
            source: "Example".to_string(),
            published: None,
            description: Some(format!("summary of {title}")),
            content: None,
            fetched_via: "rss".to_string(),
        }
    }

    #[tokio::test]
    async fn pass_persists_unique_items_and_groups_them() {
        let store = MemoryStore::new();
        let judge = MockJudge::confirming(vec![]);

        let stats = run_pass(
            &store,
            &judge,
            &config(),
            vec![
                item("OpenAI releases GPT-5", "https://a.com/1"),
                item("OpenAI Releases GPT-5 Today", "https://b.com/2"),
                item("Quantum computing milestone reached", "https://c.com/3"),
            ],
        )
        .await
        .unwrap();

        // The near-identical title was dropped as a fuzzy duplicate.
        assert_eq!(stats.unique, 2);
        assert_eq!(stats.stored, 2);
        assert_eq!(stats.groups, 0);
        assert_eq!(store.titles().len(), 2);
    }

    #[tokio::test]
    async fn repeated_pass_stores_nothing_new() {
        let store = MemoryStore::new();
        let judge = MockJudge::confirming(vec![]);
        let batch = vec![
            item("OpenAI releases GPT-5", "https://a.com/1"),
            item("Quantum computing milestone reached", "https://c.com/3"),
        ];

        let first = run_pass(&store, &judge, &config(), batch.clone()).await.unwrap();
        assert_eq!(first.stored, 2);

        let second = run_pass(&store, &judge, &config(), batch).await.unwrap();
        assert_eq!(second.unique, 0);
        assert_eq!(second.stored, 0);
        assert_eq!(store.titles().len(), 2);
    }

    #[tokio::test]
    async fn confirmed_borderline_pair_is_kept_and_linked() {
        let store = MemoryStore::new();
        // The judge confirms the single borderline pair.
        let judge = MockJudge::confirming(vec![vec![0]]);

        let stats = run_pass(
            &store,
            &judge,
            &config(),
            vec![
                item("Anthropic updates its model safety policy", "https://a.com/1"),
                item("Anthropic details new safety evaluations", "https://b.com/2"),
            ],
        )
        .await
        .unwrap();

        // Adjudication adds a grouping, never removes a kept item.
        assert_eq!(stats.unique, 2);
        assert_eq!(stats.stored, 2);
        assert_eq!(stats.confirmed, 1);
        assert_eq!(stats.linked, 1);
        assert_eq!(store.group_of(1), store.group_of(2));
        assert!(store.group_of(1).is_some());
    }

    #[tokio::test]
    async fn judge_failure_degrades_to_no_links() {
        let store = MemoryStore::new();
        let judge = MockJudge::always_failing();

        let stats = run_pass(
            &store,
            &judge,
            &config(),
            vec![
                item("Anthropic updates its model safety policy", "https://a.com/1"),
                item("Anthropic details new safety evaluations", "https://b.com/2"),
            ],
        )
        .await
        .unwrap();

        assert_eq!(stats.borderline, 1);
        assert_eq!(stats.confirmed, 0);
        assert_eq!(stats.stored, 2, "items are still persisted");
    }

    #[tokio::test]
    async fn history_from_prior_pass_suppresses_duplicates() {
        let store = MemoryStore::new();
        let judge = MockJudge::confirming(vec![]);

        run_pass(
            &store,
            &judge,
            &config(),
            vec![item("OpenAI releases GPT-5", "https://a.com/1")],
        )
        .await
        .unwrap();

        // Same story, different outlet and wording, next cycle.
        let stats = run_pass(
            &store,
            &judge,
            &config(),
            vec![item("OpenAI Releases GPT-5 Today", "https://b.com/2")],
        )
        .await
        .unwrap();
        assert_eq!(stats.unique, 0);
        assert_eq!(store.titles().len(), 1);
    }
}
