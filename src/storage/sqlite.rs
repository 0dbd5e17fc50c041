//! SQLite storage implementation
//!
//! Topics are upserted by id into the `topics` table with their full
//! filtered document as JSON. Each run gets a row in `runs`, opened by
//! `begin_run` and completed by `record_run`.

use crate::model::{Topic, TopicId};
use crate::output::{FailedTopic, RunSummary};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StorageError, StorageResult, TopicStore};
use crate::storage::{RunRecord, RunStatus, StoredTopic};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, discovered, \
     persisted, skipped, failed_topics, incomplete_topics";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
    run_id: Option<i64>,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn, run_id: None })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn, run_id: None })
    }

    /// The run opened by `begin_run`, if any
    pub fn current_run(&self) -> Option<i64> {
        self.run_id
    }

    /// Gets a run by ID
    pub fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    /// All recorded runs, newest first
    pub fn list_runs(&self) -> StorageResult<Vec<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC", RUN_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let runs = stmt
            .query_map([], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    /// Loads a saved topic row
    pub fn get_topic(&self, topic_id: TopicId) -> StorageResult<Option<StoredTopic>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, title, post_count, missing_posts, document, saved_at, run_id
                 FROM topics WHERE id = ?1",
                params![topic_id as i64],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Option<i64>>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, title, post_count, missing_posts, document, saved_at, run_id)) = row else {
            return Ok(None);
        };
        Ok(Some(StoredTopic {
            id: id as TopicId,
            title,
            post_count: post_count as usize,
            missing_posts: missing_posts as usize,
            document: serde_json::from_str(&document)?,
            saved_at,
            run_id,
        }))
    }

    /// Counts saved topics
    pub fn count_topics(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM topics", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl TopicStore for SqliteStore {
    fn begin_run(&mut self, config_hash: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        let run_id = self.conn.last_insert_rowid();
        tracing::debug!("Opened run {}", run_id);
        self.run_id = Some(run_id);
        Ok(())
    }

    fn save_topic(&mut self, topic: &Topic, missing_posts: usize) -> StorageResult<()> {
        let document = serde_json::to_string(topic)?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO topics (id, title, post_count, missing_posts, document, saved_at, run_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                post_count = excluded.post_count,
                missing_posts = excluded.missing_posts,
                document = excluded.document,
                saved_at = excluded.saved_at,
                run_id = excluded.run_id",
            params![
                topic.id() as i64,
                topic.title(),
                topic.stream.posts.len() as i64,
                missing_posts as i64,
                document,
                now,
                self.run_id,
            ],
        )?;
        tracing::info!(
            "Saved topic {} ({} posts) to database",
            topic.id(),
            topic.stream.posts.len()
        );
        Ok(())
    }

    fn record_run(&mut self, summary: &RunSummary) -> StorageResult<()> {
        let finished_at = summary.finished_at.unwrap_or_else(Utc::now).to_rfc3339();
        let failed_topics = serde_json::to_string(&summary.failed)?;
        let incomplete_topics = serde_json::to_string(&summary.incomplete)?;

        match self.run_id {
            Some(run_id) => {
                self.conn.execute(
                    "UPDATE runs SET finished_at = ?1, status = ?2, discovered = ?3,
                        persisted = ?4, skipped = ?5, failed_topics = ?6,
                        incomplete_topics = ?7
                     WHERE id = ?8",
                    params![
                        finished_at,
                        RunStatus::Completed.to_db_string(),
                        summary.discovered as i64,
                        summary.persisted as i64,
                        summary.skipped() as i64,
                        failed_topics,
                        incomplete_topics,
                        run_id,
                    ],
                )?;
            }
            None => {
                self.conn.execute(
                    "INSERT INTO runs (started_at, finished_at, config_hash, status, discovered,
                        persisted, skipped, failed_topics, incomplete_topics)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        summary.started_at.to_rfc3339(),
                        finished_at,
                        summary.config_hash,
                        RunStatus::Completed.to_db_string(),
                        summary.discovered as i64,
                        summary.persisted as i64,
                        summary.skipped() as i64,
                        failed_topics,
                        incomplete_topics,
                    ],
                )?;
                self.run_id = Some(self.conn.last_insert_rowid());
            }
        }
        Ok(())
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let failed_topics: Vec<FailedTopic> = json_column(row, 8)?;
    let incomplete_topics: Vec<TopicId> = json_column(row, 9)?;
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        discovered: row.get::<_, i64>(5)? as u64,
        persisted: row.get::<_, i64>(6)? as u64,
        skipped: row.get::<_, i64>(7)? as u64,
        failed_topics,
        incomplete_topics,
    })
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
