//! Semantic adjudication of ambiguous title pairs.
//!
//! Fuzzy scoring alone cannot tell "same story, different wording" from
//! "different stories sharing vocabulary". Pairs in the ambiguous band are
//! sent in batches to an external judge that returns the pair numbers it
//! confirms as the same story. The judge is advisory only: its output is
//! always a subset of the input, so it can add groupings but never remove
//! already-kept items.
//!
//! Failure handling is per batch. A call failure or an answer that is not a
//! well-formed list of in-range pair numbers yields zero confirmations for
//! that batch and never aborts the pass.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use newswire_common::{BorderlinePair, MergeBrief};

use crate::claude::{ChatRequest, ClaudeClient, WireMessage};

/// Longest summary excerpt included per item in a judge prompt.
const SUMMARY_EXCERPT_LEN: usize = 200;

/// One candidate pair with the context the judge sees.
#[derive(Debug, Clone)]
pub struct PairContext {
    pub title_a: String,
    pub title_b: String,
    pub source_a: Option<String>,
    pub source_b: Option<String>,
    pub summary_a: Option<String>,
    pub summary_b: Option<String>,
}

impl PairContext {
    /// Title-only context, for pre-persist borderline pairs.
    pub fn from_pair(pair: &BorderlinePair) -> Self {
        Self {
            title_a: pair.title_a.clone(),
            title_b: pair.title_b.clone(),
            source_a: None,
            source_b: None,
            summary_a: None,
            summary_b: None,
        }
    }

    /// Full context for the deep merge pass.
    pub fn from_briefs(a: &MergeBrief, b: &MergeBrief) -> Self {
        Self {
            title_a: a.title.clone(),
            title_b: b.title.clone(),
            source_a: Some(a.source.clone()),
            source_b: Some(b.source.clone()),
            summary_a: Some(excerpt(&a.summary)),
            summary_b: Some(excerpt(&b.summary)),
        }
    }
}

fn excerpt(summary: &str) -> String {
    if summary.is_empty() {
        return "(no summary)".to_string();
    }
    summary.chars().take(SUMMARY_EXCERPT_LEN).collect()
}

/// One batch of pair contexts in, zero-based indices of confirmed pairs out.
#[async_trait]
pub trait StoryJudge: Send + Sync {
    async fn confirm(&self, batch: &[PairContext]) -> Result<Vec<usize>>;
}

/// Run every pair past the judge in batches of `batch_size`, returning the
/// confirmed subset in input order.
pub async fn adjudicate(
    judge: &dyn StoryJudge,
    pairs: &[PairContext],
    batch_size: usize,
) -> Vec<PairContext> {
    if pairs.is_empty() {
        return Vec::new();
    }

    let batch_size = batch_size.max(1);
    let mut confirmed = Vec::new();
    for (batch_index, batch) in pairs.chunks(batch_size).enumerate() {
        match judge.confirm(batch).await {
            Ok(indices) => {
                for index in indices {
                    if let Some(pair) = batch.get(index) {
                        confirmed.push(pair.clone());
                    }
                }
            }
            Err(error) => {
                warn!(batch = batch_index, error = %error, "Adjudication batch failed, treating as zero confirmations");
            }
        }
    }

    if !confirmed.is_empty() {
        info!(confirmed = confirmed.len(), total = pairs.len(), "Judge confirmed same-story pairs");
    }
    confirmed
}

// ---------------------------------------------------------------------------
// ClaudeJudge
// ---------------------------------------------------------------------------

pub struct ClaudeJudge {
    client: ClaudeClient,
    model: String,
}

impl ClaudeJudge {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: ClaudeClient::new(api_key),
            model: model.to_string(),
        }
    }

    #[allow(dead_code)] // test servers override the endpoint
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.client = self.client.with_base_url(url);
        self
    }
}

#[async_trait]
impl StoryJudge for ClaudeJudge {
    async fn confirm(&self, batch: &[PairContext]) -> Result<Vec<usize>> {
        let request = ChatRequest::new(&self.model).message(WireMessage::user(build_prompt(batch)));
        let response = self.client.chat(&request).await?;
        let text = response.text().unwrap_or_default();
        Ok(parse_confirmations(&text, batch.len()))
    }
}

fn build_prompt(batch: &[PairContext]) -> String {
    let pairs_text = batch
        .iter()
        .enumerate()
        .map(|(i, pair)| {
            let mut lines = Vec::new();
            match &pair.source_a {
                Some(source) => lines.push(format!("{}. A: \"{}\" ({})", i + 1, pair.title_a, source)),
                None => lines.push(format!("{}. A: \"{}\"", i + 1, pair.title_a)),
            }
            if let Some(summary) = &pair.summary_a {
                lines.push(format!("   Summary: {summary}"));
            }
            match &pair.source_b {
                Some(source) => lines.push(format!("   B: \"{}\" ({})", pair.title_b, source)),
                None => lines.push(format!("   B: \"{}\"", pair.title_b)),
            }
            if let Some(summary) = &pair.summary_b {
                lines.push(format!("   Summary: {summary}"));
            }
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a news deduplication assistant. For each pair below, determine if \
article A is about the same specific news story/event as article B.\n\n\
Answer ONLY with a JSON array of pair numbers that ARE about the same story. \
If none match, return an empty array [].\n\n\
Be strict: two articles must be about the same specific event or announcement \
to count. Articles about the same general topic but different events are NOT \
the same story.\n\n\
{pairs_text}\n\n\
Return ONLY a JSON array, e.g. [1, 3] or []. No other text."
    )
}

/// Parse the judge's answer into zero-based batch indices.
///
/// The answer must be a JSON array of 1-based pair numbers, all in range.
/// Anything else — prose, a non-array, a fractional number, an out-of-range
/// entry — counts as zero confirmations for the whole batch.
fn parse_confirmations(text: &str, batch_len: usize) -> Vec<usize> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text.trim()) else {
        warn!(response = text, "Judge response is not valid JSON, ignoring batch");
        return Vec::new();
    };
    let Some(entries) = value.as_array() else {
        warn!(response = text, "Judge response is not a JSON array, ignoring batch");
        return Vec::new();
    };

    let mut indices = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.as_u64() {
            Some(number) if (1..=batch_len as u64).contains(&number) => {
                indices.push((number - 1) as usize);
            }
            _ => {
                warn!(response = text, "Judge response contains an out-of-range entry, ignoring batch");
                return Vec::new();
            }
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockJudge;

    fn pair(a: &str, b: &str) -> PairContext {
        PairContext::from_pair(&BorderlinePair::new(a, b))
    }

    // --- parse_confirmations ---

    #[test]
    fn parses_valid_answer() {
        assert_eq!(parse_confirmations("[1, 3]", 3), vec![0, 2]);
        assert_eq!(parse_confirmations("  []  ", 3), Vec::<usize>::new());
    }

    #[test]
    fn prose_answer_yields_nothing() {
        assert_eq!(parse_confirmations("Pairs 1 and 3 match.", 3), Vec::<usize>::new());
    }

    #[test]
    fn non_array_json_yields_nothing() {
        assert_eq!(parse_confirmations("{\"pairs\": [1]}", 3), Vec::<usize>::new());
    }

    #[test]
    fn out_of_range_entry_discards_batch() {
        assert_eq!(parse_confirmations("[1, 7]", 3), Vec::<usize>::new());
        assert_eq!(parse_confirmations("[0]", 3), Vec::<usize>::new());
        assert_eq!(parse_confirmations("[-2]", 3), Vec::<usize>::new());
    }

    #[test]
    fn non_integer_entry_discards_batch() {
        assert_eq!(parse_confirmations("[1, \"2\"]", 3), Vec::<usize>::new());
        assert_eq!(parse_confirmations("[1.5]", 3), Vec::<usize>::new());
    }

    // --- adjudicate ---

    #[tokio::test]
    async fn confirmed_subset_is_returned() {
        let judge = MockJudge::confirming(vec![vec![1]]);
        let pairs = vec![pair("a", "b"), pair("c", "d")];
        let confirmed = adjudicate(&judge, &pairs, 10).await;
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].title_a, "c");
    }

    #[tokio::test]
    async fn batching_respects_batch_size() {
        let judge = MockJudge::confirming(vec![vec![0], vec![0]]);
        let pairs = vec![pair("a", "b"), pair("c", "d"), pair("e", "f")];
        let confirmed = adjudicate(&judge, &pairs, 2).await;

        let batches = judge.received();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1].len(), 1);
        // First of each batch: "a" and "e".
        assert_eq!(confirmed.len(), 2);
        assert_eq!(confirmed[0].title_a, "a");
        assert_eq!(confirmed[1].title_a, "e");
    }

    #[tokio::test]
    async fn failed_batch_is_skipped_not_fatal() {
        let judge = MockJudge::failing_then(vec![vec![0]]);
        let pairs = vec![pair("a", "b"), pair("c", "d")];
        let confirmed = adjudicate(&judge, &pairs, 1).await;
        // First batch errored, second confirmed its only pair.
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].title_a, "c");
    }

    #[tokio::test]
    async fn out_of_range_judge_indices_are_ignored() {
        let judge = MockJudge::confirming(vec![vec![5]]);
        let pairs = vec![pair("a", "b")];
        let confirmed = adjudicate(&judge, &pairs, 10).await;
        assert!(confirmed.is_empty());
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let judge = MockJudge::confirming(vec![]);
        let confirmed = adjudicate(&judge, &[], 10).await;
        assert!(confirmed.is_empty());
        assert!(judge.received().is_empty());
    }

    // --- prompt shape ---

    #[test]
    fn prompt_numbers_pairs_from_one() {
        let prompt = build_prompt(&[pair("First A", "First B"), pair("Second A", "Second B")]);
        assert!(prompt.contains("1. A: \"First A\""));
        assert!(prompt.contains("2. A: \"Second A\""));
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn prompt_includes_context_when_present() {
        let a = MergeBrief {
            id: 1,
            title: "Launch covered".to_string(),
            url: "https://a.com".to_string(),
            source: "Example News".to_string(),
            summary: "x".repeat(400),
            group_id: None,
            score: 5,
        };
        let b = MergeBrief {
            id: 2,
            title: "Launch announced".to_string(),
            url: "https://b.com".to_string(),
            source: "Vendor Blog".to_string(),
            summary: String::new(),
            group_id: None,
            score: 7,
        };
        let prompt = build_prompt(&[PairContext::from_briefs(&a, &b)]);
        assert!(prompt.contains("(Example News)"));
        assert!(prompt.contains("(no summary)"));
        // Long summaries are excerpted.
        assert!(!prompt.contains(&"x".repeat(201)));
        assert!(prompt.contains(&"x".repeat(200)));
    }
}
