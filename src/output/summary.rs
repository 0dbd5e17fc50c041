//! Run summary types
//!
//! This module defines the per-run tally the pipeline builds up and the
//! error type shared by the output writers.

use crate::crawler::{FailureReason, StopReason};
use crate::model::{DateWindow, TopicId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A topic that could not be assembled or persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTopic {
    pub topic_id: TopicId,
    pub reason: FailureReason,
}

/// Outcome of one harvest run
#[derive(Debug, Clone)]
pub struct RunSummary {
    // Run metadata
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub config_hash: String,
    pub discovery_window: DateWindow,
    pub filter_window: DateWindow,

    // Discovery
    pub pages_fetched: u32,
    pub discovery_stop: Option<StopReason>,

    // Counters
    pub discovered: usize,
    pub persisted: usize,
    pub failed: Vec<FailedTopic>,

    /// Persisted topics whose assembly left stream posts unfetched
    pub incomplete: Vec<TopicId>,
}

impl RunSummary {
    /// Starts a summary stamped with the current time
    pub fn new(config_hash: &str, discovery_window: DateWindow, filter_window: DateWindow) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            config_hash: config_hash.to_string(),
            discovery_window,
            filter_window,
            pages_fetched: 0,
            discovery_stop: None,
            discovered: 0,
            persisted: 0,
            failed: Vec::new(),
            incomplete: Vec::new(),
        }
    }

    pub fn record_failure(&mut self, topic_id: TopicId, reason: FailureReason) {
        self.failed.push(FailedTopic { topic_id, reason });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Discovered topics that were neither persisted nor failed
    pub fn skipped(&self) -> usize {
        self.discovered
            .saturating_sub(self.persisted)
            .saturating_sub(self.failed.len())
    }

    pub fn failed_ids(&self) -> Vec<TopicId> {
        self.failed.iter().map(|f| f.topic_id).collect()
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}
