// Test doubles for the engine's two trait boundaries:
// - MemoryStore (StoryStore) — stateful in-memory corpus
// - MockJudge (StoryJudge) — scripted confirmations, records batches
//
// No database, no network; deterministic `cargo test` runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use newswire_common::{ItemBrief, MergeBrief, RawNewsItem};

use crate::adjudicator::{PairContext, StoryJudge};
use crate::traits::StoryStore;

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Row {
    id: i64,
    title: String,
    url: String,
    source: String,
    summary: String,
    score: i64,
    group_id: Option<i64>,
}

/// In-memory corpus with the same observable behavior as the SQLite store:
/// URL uniqueness on insert, score-descending rank order, atomic group
/// replacement.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Row>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row directly, bypassing dedup. Returns the new id.
    pub fn seed(&self, title: &str, url: &str, score: i64) -> i64 {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as i64 + 1;
        rows.push(Row {
            id,
            title: title.to_string(),
            url: url.to_string(),
            source: "Example".to_string(),
            summary: format!("summary of {title}"),
            score,
            group_id: None,
        });
        id
    }

    /// Set a group id directly, as if assigned by a prior pass.
    pub fn force_group(&self, item_id: i64, group_id: i64) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| row.id == item_id) {
            row.group_id = Some(group_id);
        }
    }

    pub fn group_of(&self, item_id: i64) -> Option<i64> {
        let rows = self.rows.lock().unwrap();
        rows.iter().find(|row| row.id == item_id)?.group_id
    }

    pub fn score_of(&self, item_id: i64) -> i64 {
        let rows = self.rows.lock().unwrap();
        rows.iter().find(|row| row.id == item_id).map(|row| row.score).unwrap_or(0)
    }

    pub fn titles(&self) -> Vec<String> {
        let rows = self.rows.lock().unwrap();
        rows.iter().map(|row| row.title.clone()).collect()
    }

    fn brief(row: &Row) -> MergeBrief {
        MergeBrief {
            id: row.id,
            title: row.title.clone(),
            url: row.url.clone(),
            source: row.source.clone(),
            summary: row.summary.clone(),
            group_id: row.group_id,
            score: row.score,
        }
    }
}

#[async_trait]
impl StoryStore for MemoryStore {
    async fn all_urls(&self) -> Result<Vec<String>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().map(|row| row.url.clone()).collect())
    }

    async fn all_titles_lower(&self) -> Result<Vec<String>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().map(|row| row.title.to_lowercase()).collect())
    }

    async fn items_by_rank(&self) -> Result<Vec<ItemBrief>> {
        let rows = self.rows.lock().unwrap();
        let mut sorted: Vec<&Row> = rows.iter().collect();
        sorted.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        Ok(sorted
            .into_iter()
            .map(|row| ItemBrief {
                id: row.id,
                title: row.title.clone(),
                url: row.url.clone(),
            })
            .collect())
    }

    async fn items_for_merge(&self) -> Result<Vec<MergeBrief>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().map(Self::brief).collect())
    }

    async fn find_by_title_lower(&self, title_lower: &str) -> Result<Vec<MergeBrief>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|row| row.title.to_lowercase() == title_lower)
            .map(Self::brief)
            .collect())
    }

    async fn insert_item(&self, item: &RawNewsItem) -> Result<Option<i64>> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|row| row.url == item.url) {
            return Ok(None);
        }
        let id = rows.len() as i64 + 1;
        rows.push(Row {
            id,
            title: item.title.clone(),
            url: item.url.clone(),
            source: item.source.clone(),
            summary: item.description.clone().unwrap_or_default(),
            score: 0,
            group_id: None,
        });
        Ok(Some(id))
    }

    async fn set_group(&self, item_id: i64, group_id: i64) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| row.id == item_id) {
            row.group_id = Some(group_id);
        }
        Ok(())
    }

    async fn replace_all_groups(&self, assignments: &[(i64, i64)]) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        for row in rows.iter_mut() {
            row.group_id = None;
        }
        for (item_id, group_id) in assignments {
            if let Some(row) = rows.iter_mut().find(|row| row.id == *item_id) {
                row.group_id = Some(*group_id);
            }
        }
        Ok(())
    }

    async fn max_group_id(&self) -> Result<i64> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().filter_map(|row| row.group_id).max().unwrap_or(0))
    }

    async fn get_score(&self, item_id: i64) -> Result<i64> {
        let rows = self.rows.lock().unwrap();
        match rows.iter().find(|row| row.id == item_id) {
            Some(row) => Ok(row.score),
            None => bail!("no row with id {item_id}"),
        }
    }

    async fn set_score(&self, item_id: i64, score: i64) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| row.id == item_id) {
            row.score = score;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockJudge
// ---------------------------------------------------------------------------

enum Scripted {
    Confirm(Vec<usize>),
    Fail,
}

/// Scripted judge. Responses are consumed one per batch, in order; an
/// exhausted script confirms nothing. Every received batch is recorded.
pub struct MockJudge {
    script: Mutex<VecDeque<Scripted>>,
    confirm_everything: bool,
    always_fail: bool,
    received: Mutex<Vec<Vec<PairContext>>>,
}

impl MockJudge {
    fn with_script(script: VecDeque<Scripted>) -> Self {
        Self {
            script: Mutex::new(script),
            confirm_everything: false,
            always_fail: false,
            received: Mutex::new(Vec::new()),
        }
    }

    /// One response per expected batch: the zero-based indices to confirm.
    pub fn confirming(batches: Vec<Vec<usize>>) -> Self {
        Self::with_script(batches.into_iter().map(Scripted::Confirm).collect())
    }

    /// Confirms every pair of every batch.
    pub fn confirming_all() -> Self {
        Self {
            confirm_everything: true,
            ..Self::with_script(VecDeque::new())
        }
    }

    /// Fails every call, like a judge that is unreachable.
    pub fn always_failing() -> Self {
        Self {
            always_fail: true,
            ..Self::with_script(VecDeque::new())
        }
    }

    /// Fails the first call, then follows the given script.
    pub fn failing_then(batches: Vec<Vec<usize>>) -> Self {
        let mut script: VecDeque<Scripted> = VecDeque::from([Scripted::Fail]);
        script.extend(batches.into_iter().map(Scripted::Confirm));
        Self::with_script(script)
    }

    /// Batches received so far, in call order.
    pub fn received(&self) -> Vec<Vec<PairContext>> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoryJudge for MockJudge {
    async fn confirm(&self, batch: &[PairContext]) -> Result<Vec<usize>> {
        self.received.lock().unwrap().push(batch.to_vec());

        if self.always_fail {
            bail!("scripted judge failure");
        }
        if self.confirm_everything {
            return Ok((0..batch.len()).collect());
        }
        let mut script = self.script.lock().unwrap();
        match script.pop_front() {
            Some(Scripted::Confirm(indices)) => Ok(indices),
            Some(Scripted::Fail) => bail!("scripted judge failure"),
            None => Ok(Vec::new()),
        }
    }
}
