// Trait abstraction over the persistence collaborator.
//
// StoryStore is the only way the engine reads or writes the corpus. The
// production implementation is newswire_store::Database (SQLite); tests use
// testing::MemoryStore for deterministic runs with no database.

use anyhow::Result;
use async_trait::async_trait;

use newswire_common::{ItemBrief, MergeBrief, RawNewsItem};
use newswire_store::Database;

#[async_trait]
pub trait StoryStore: Send + Sync {
    /// All stored URLs, raw; the engine normalizes them for comparison.
    async fn all_urls(&self) -> Result<Vec<String>>;

    /// All stored titles, lowercased.
    async fn all_titles_lower(&self) -> Result<Vec<String>>;

    /// Minimal rows ordered by relevance score descending.
    async fn items_by_rank(&self) -> Result<Vec<ItemBrief>>;

    /// Full-context rows for the deep merge pass.
    async fn items_for_merge(&self) -> Result<Vec<MergeBrief>>;

    /// All rows whose lowercased title equals `title_lower`.
    async fn find_by_title_lower(&self, title_lower: &str) -> Result<Vec<MergeBrief>>;

    /// Persist a resolved item; `None` when the URL is already stored.
    async fn insert_item(&self, item: &RawNewsItem) -> Result<Option<i64>>;

    async fn set_group(&self, item_id: i64, group_id: i64) -> Result<()>;

    /// Atomically clear every group_id and apply the new assignments.
    async fn replace_all_groups(&self, assignments: &[(i64, i64)]) -> Result<()>;

    /// Highest stored group_id, 0 when nothing is grouped.
    async fn max_group_id(&self) -> Result<i64>;

    async fn get_score(&self, item_id: i64) -> Result<i64>;

    async fn set_score(&self, item_id: i64, score: i64) -> Result<()>;
}

#[async_trait]
impl StoryStore for Database {
    async fn all_urls(&self) -> Result<Vec<String>> {
        Database::all_urls(self).await
    }

    async fn all_titles_lower(&self) -> Result<Vec<String>> {
        Database::all_titles_lower(self).await
    }

    async fn items_by_rank(&self) -> Result<Vec<ItemBrief>> {
        Database::items_by_rank(self).await
    }

    async fn items_for_merge(&self) -> Result<Vec<MergeBrief>> {
        Database::items_for_merge(self).await
    }

    async fn find_by_title_lower(&self, title_lower: &str) -> Result<Vec<MergeBrief>> {
        Database::find_by_title_lower(self, title_lower).await
    }

    async fn insert_item(&self, item: &RawNewsItem) -> Result<Option<i64>> {
        Database::insert_item(self, item).await
    }

    async fn set_group(&self, item_id: i64, group_id: i64) -> Result<()> {
        Database::set_group(self, item_id, group_id).await
    }

    async fn replace_all_groups(&self, assignments: &[(i64, i64)]) -> Result<()> {
        Database::replace_all_groups(self, assignments).await
    }

    async fn max_group_id(&self) -> Result<i64> {
        Database::max_group_id(self).await
    }

    async fn get_score(&self, item_id: i64) -> Result<i64> {
        Database::get_score(self, item_id).await
    }

    async fn set_score(&self, item_id: i64, score: i64) -> Result<()> {
        Database::set_score(self, item_id, score).await
    }
}
