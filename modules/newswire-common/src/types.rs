use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news item as handed over by an extraction collaborator (RSS fetcher,
/// web search, HTML scrape), before any matching or persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNewsItem {
    pub title: String,
    pub url: String,
    pub source: String,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// How the item was fetched ("rss", "web_search", "html_scrape").
    #[serde(default)]
    pub fetched_via: String,
}

/// Minimal row for the cluster builder: everything it compares on.
#[derive(Debug, Clone)]
pub struct ItemBrief {
    pub id: i64,
    pub title: String,
    pub url: String,
}

/// Row for the deep merge pass, with the context the adjudicator sees.
#[derive(Debug, Clone)]
pub struct MergeBrief {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub source: String,
    pub summary: String,
    pub group_id: Option<i64>,
    pub score: i64,
}

/// Two titles whose similarity fell inside the ambiguous band. Transient:
/// exists only between a dedup/merge pass and the adjudicator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorderlinePair {
    pub title_a: String,
    pub title_b: String,
}

impl BorderlinePair {
    pub fn new(title_a: impl Into<String>, title_b: impl Into<String>) -> Self {
        Self {
            title_a: title_a.into(),
            title_b: title_b.into(),
        }
    }
}
