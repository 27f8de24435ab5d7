//! SQLite persistence for news items.
//!
//! One table, `news_items`, holds the whole corpus. The engine never touches
//! SQL directly — it goes through `Database`, and group reassignment is a
//! single transaction so a crash mid-rebuild cannot leave the corpus half
//! cleared.

use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use newswire_common::{ItemBrief, MergeBrief, RawNewsItem};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS news_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        url TEXT NOT NULL UNIQUE,
        source TEXT NOT NULL,
        published TEXT,
        summary TEXT DEFAULT '',
        score INTEGER DEFAULT 0,
        category TEXT DEFAULT 'Industry',
        fetched_via TEXT DEFAULT '',
        processed_at TEXT NOT NULL,
        acknowledged INTEGER DEFAULT 0,
        group_id INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS idx_score ON news_items(score DESC)",
    "CREATE INDEX IF NOT EXISTS idx_published ON news_items(published DESC)",
    "CREATE INDEX IF NOT EXISTS idx_group_id ON news_items(group_id)",
];

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database at `url` and apply the schema.
    ///
    /// The pool is capped at one connection: the pipeline is a single batch
    /// writer with exclusive access to the corpus during a run.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        debug!(url, "Database ready");
        Ok(Self { pool })
    }

    /// Insert a resolved item. Returns the new row id, or `None` if the URL
    /// is already stored (the UNIQUE constraint makes re-runs idempotent).
    pub async fn insert_item(&self, item: &RawNewsItem) -> Result<Option<i64>> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO news_items
               (title, url, source, published, summary, fetched_via, processed_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&item.title)
        .bind(&item.url)
        .bind(&item.source)
        .bind(item.published)
        .bind(item.description.as_deref().unwrap_or(""))
        .bind(&item.fetched_via)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(None)
        } else {
            Ok(Some(result.last_insert_rowid()))
        }
    }

    /// All stored URLs, as persisted (the caller normalizes them).
    pub async fn all_urls(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT url FROM news_items")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(url,)| url).collect())
    }

    /// All stored titles, lowercased for comparison.
    pub async fn all_titles_lower(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT LOWER(title) FROM news_items")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(title,)| title).collect())
    }

    /// Minimal rows for the cluster builder, ordered by relevance score
    /// descending. This ordering decides which item anchors a cluster.
    pub async fn items_by_rank(&self) -> Result<Vec<ItemBrief>> {
        let rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, title, url FROM news_items ORDER BY score DESC, id ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, title, url)| ItemBrief { id, title, url })
            .collect())
    }

    /// Full-context rows for the deep merge pass.
    pub async fn items_for_merge(&self) -> Result<Vec<MergeBrief>> {
        let rows: Vec<(i64, String, String, String, String, Option<i64>, i64)> = sqlx::query_as(
            "SELECT id, title, url, source, COALESCE(summary, ''), group_id, score
               FROM news_items ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(
                |(id, title, url, source, summary, group_id, score)| MergeBrief {
                    id,
                    title,
                    url,
                    source,
                    summary,
                    group_id,
                    score,
                },
            )
            .collect())
    }

    /// All rows whose lowercased title matches. The merger requires exactly
    /// one match to act on a confirmed pair.
    pub async fn find_by_title_lower(&self, title_lower: &str) -> Result<Vec<MergeBrief>> {
        let rows: Vec<(i64, String, String, String, String, Option<i64>, i64)> = sqlx::query_as(
            "SELECT id, title, url, source, COALESCE(summary, ''), group_id, score
               FROM news_items WHERE LOWER(title) = ?1",
        )
        .bind(title_lower)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(
                |(id, title, url, source, summary, group_id, score)| MergeBrief {
                    id,
                    title,
                    url,
                    source,
                    summary,
                    group_id,
                    score,
                },
            )
            .collect())
    }

    pub async fn set_group(&self, item_id: i64, group_id: i64) -> Result<()> {
        sqlx::query("UPDATE news_items SET group_id = ?1 WHERE id = ?2")
            .bind(group_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Clear every group_id and apply the given assignments in one
    /// transaction. The rebuild is atomic: either the old partition or the
    /// new one is visible, never a mix.
    pub async fn replace_all_groups(&self, assignments: &[(i64, i64)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE news_items SET group_id = NULL")
            .execute(&mut *tx)
            .await?;
        for (item_id, group_id) in assignments {
            sqlx::query("UPDATE news_items SET group_id = ?1 WHERE id = ?2")
                .bind(group_id)
                .bind(item_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Highest group_id currently stored, 0 when no item is grouped.
    pub async fn max_group_id(&self) -> Result<i64> {
        let (max,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(group_id), 0) FROM news_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(max)
    }

    pub async fn get_score(&self, item_id: i64) -> Result<i64> {
        let (score,): (i64,) = sqlx::query_as("SELECT score FROM news_items WHERE id = ?1")
            .bind(item_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(score)
    }

    pub async fn set_score(&self, item_id: i64, score: i64) -> Result<()> {
        sqlx::query("UPDATE news_items SET score = ?1 WHERE id = ?2")
            .bind(score)
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Group id of a single item, for tests and diagnostics.
    pub async fn group_of(&self, item_id: i64) -> Result<Option<i64>> {
        let (group_id,): (Option<i64>,) =
            sqlx::query_as("SELECT group_id FROM news_items WHERE id = ?1")
                .bind(item_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(group_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: &str, url: &str) -> RawNewsItem {
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

    async fn memory_db() -> Database {
        Database::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn insert_and_read_back() {
        let db = memory_db().await;
        let id = db.insert_item(&raw("First story", "https://a.com/1")).await.unwrap();
        assert!(id.is_some());

        let urls = db.all_urls().await.unwrap();
        assert_eq!(urls, vec!["https://a.com/1"]);

        let titles = db.all_titles_lower().await.unwrap();
        assert_eq!(titles, vec!["first story"]);
    }

    #[tokio::test]
    async fn duplicate_url_is_ignored() {
        let db = memory_db().await;
        db.insert_item(&raw("First story", "https://a.com/1")).await.unwrap();
        let second = db.insert_item(&raw("Other title", "https://a.com/1")).await.unwrap();
        assert!(second.is_none());
        assert_eq!(db.all_urls().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn items_by_rank_orders_by_score_desc() {
        let db = memory_db().await;
        let low = db.insert_item(&raw("Low", "https://a.com/low")).await.unwrap().unwrap();
        let high = db.insert_item(&raw("High", "https://a.com/high")).await.unwrap().unwrap();
        db.set_score(low, 3).await.unwrap();
        db.set_score(high, 9).await.unwrap();

        let items = db.items_by_rank().await.unwrap();
        assert_eq!(items[0].id, high);
        assert_eq!(items[1].id, low);
    }

    #[tokio::test]
    async fn replace_all_groups_clears_old_assignments() {
        let db = memory_db().await;
        let a = db.insert_item(&raw("A", "https://a.com/a")).await.unwrap().unwrap();
        let b = db.insert_item(&raw("B", "https://a.com/b")).await.unwrap().unwrap();
        db.set_group(a, 7).await.unwrap();

        db.replace_all_groups(&[(b, 1)]).await.unwrap();

        assert_eq!(db.group_of(a).await.unwrap(), None);
        assert_eq!(db.group_of(b).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn max_group_id_defaults_to_zero() {
        let db = memory_db().await;
        db.insert_item(&raw("A", "https://a.com/a")).await.unwrap();
        assert_eq!(db.max_group_id().await.unwrap(), 0);

        let b = db.insert_item(&raw("B", "https://a.com/b")).await.unwrap().unwrap();
        db.set_group(b, 12).await.unwrap();
        assert_eq!(db.max_group_id().await.unwrap(), 12);
    }

    #[tokio::test]
    async fn find_by_title_lower_matches_case_insensitively() {
        let db = memory_db().await;
        db.insert_item(&raw("Big Launch", "https://a.com/a")).await.unwrap();
        let rows = db.find_by_title_lower("big launch").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Big Launch");
    }

    #[tokio::test]
    async fn scores_round_trip() {
        let db = memory_db().await;
        let a = db.insert_item(&raw("A", "https://a.com/a")).await.unwrap().unwrap();
        assert_eq!(db.get_score(a).await.unwrap(), 0);
        db.set_score(a, 8).await.unwrap();
        assert_eq!(db.get_score(a).await.unwrap(), 8);
    }
}
