//! Storage traits and error types
//!
//! This module defines the interface the pipeline hands finished topics to,
//! and the errors a store may report.

use crate::model::Topic;
use crate::output::RunSummary;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination for filtered topics
///
/// The pipeline calls `save_topic` once per relevant topic, keyed by the
/// topic id. A failed save is tallied by the caller and never aborts a run.
pub trait TopicStore {
    /// Called once before the first topic of a run is saved
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file driving the run
    fn begin_run(&mut self, _config_hash: &str) -> StorageResult<()> {
        Ok(())
    }

    /// Persists one filtered topic
    ///
    /// # Arguments
    ///
    /// * `topic` - The topic, reduced to its in-window posts
    /// * `missing_posts` - Number of stream posts that could not be fetched
    ///   during assembly (0 for a complete topic)
    fn save_topic(&mut self, topic: &Topic, missing_posts: usize) -> StorageResult<()>;

    /// Records the outcome of a finished run
    ///
    /// Stores without a run ledger ignore this.
    fn record_run(&mut self, _summary: &RunSummary) -> StorageResult<()> {
        Ok(())
    }
}

impl<T: TopicStore + ?Sized> TopicStore for Box<T> {
    fn begin_run(&mut self, config_hash: &str) -> StorageResult<()> {
        (**self).begin_run(config_hash)
    }

    fn save_topic(&mut self, topic: &Topic, missing_posts: usize) -> StorageResult<()> {
        (**self).save_topic(topic, missing_posts)
    }

    fn record_run(&mut self, summary: &RunSummary) -> StorageResult<()> {
        (**self).record_run(summary)
    }
}
