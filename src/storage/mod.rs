//! Storage module for persisting harvested topics
//!
//! This module handles:
//! - The `TopicStore` interface the pipeline writes through
//! - A JSON directory store (one file per topic)
//! - A SQLite store with a run ledger

mod json_dir;
mod schema;
mod sqlite;
mod traits;

pub use json_dir::JsonDirStore;
pub use sqlite::SqliteStore;
pub use traits::{StorageError, StorageResult, TopicStore};

use crate::config::{OutputConfig, OutputFormat};
use crate::model::TopicId;
use crate::output::FailedTopic;
use std::path::Path;

/// Opens the store selected by the output configuration
///
/// # Arguments
///
/// * `config` - The output section of the configuration
///
/// # Returns
///
/// * `Ok(Box<dyn TopicStore>)` - The opened store
/// * `Err(StorageError)` - The directory or database could not be opened
pub fn open_store(config: &OutputConfig) -> StorageResult<Box<dyn TopicStore>> {
    match config.format {
        OutputFormat::Json => Ok(Box::new(JsonDirStore::new(&config.directory)?)),
        OutputFormat::Sqlite => {
            let path = config.database_path.as_deref().ok_or_else(|| {
                StorageError::Database("sqlite output requires database-path".to_string())
            })?;
            Ok(Box::new(SqliteStore::new(Path::new(path))?))
        }
    }
}

/// A topic row read back from the database
#[derive(Debug, Clone)]
pub struct StoredTopic {
    pub id: TopicId,
    pub title: Option<String>,
    pub post_count: usize,
    pub missing_posts: usize,
    pub document: serde_json::Value,
    pub saved_at: String,
    pub run_id: Option<i64>,
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub discovered: u64,
    pub persisted: u64,
    pub skipped: u64,
    pub failed_topics: Vec<FailedTopic>,
    pub incomplete_topics: Vec<TopicId>,
}

/// Status of a harvest run
///
/// A run left in `Running` was interrupted before its summary was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}
