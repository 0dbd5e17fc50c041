//! One JSON file per topic
//!
//! Topics are written as `topic_{id}.json`, pretty-printed with two-space
//! indentation and non-ASCII text kept as-is. Saving a topic again
//! overwrites its file.

use crate::model::{Topic, TopicId};
use crate::storage::traits::{StorageResult, TopicStore};
use std::fs;
use std::path::PathBuf;

/// Writes each topic to its own file in a directory
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    directory: PathBuf,
}

impl JsonDirStore {
    /// Opens the store, creating `directory` if it does not exist
    pub fn new(directory: impl Into<PathBuf>) -> StorageResult<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    /// Path of the file a topic is written to
    pub fn path_for(&self, topic_id: TopicId) -> PathBuf {
        self.directory.join(format!("topic_{}.json", topic_id))
    }
}

impl TopicStore for JsonDirStore {
    fn save_topic(&mut self, topic: &Topic, missing_posts: usize) -> StorageResult<()> {
        let path = self.path_for(topic.id());
        let json = serde_json::to_string_pretty(topic)?;
        fs::write(&path, json)?;

        if missing_posts > 0 {
            tracing::warn!(
                "Saved topic {} to {} with {} posts missing",
                topic.id(),
                path.display(),
                missing_posts
            );
        } else {
            tracing::info!("Saved topic {} to {}", topic.id(), path.display());
        }
        Ok(())
    }
}
