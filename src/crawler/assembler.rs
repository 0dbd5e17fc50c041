//! Topic assembly
//!
//! A topic document only embeds the first page of posts, while
//! `post_stream.stream` lists every post id. Assembly fetches the missing
//! posts in batches, merges them (first-seen wins) and puts the result back
//! into stream order.

use crate::client::{FetchError, TopicSource};
use crate::model::{DocumentError, Topic, TopicId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default number of post ids per batch request
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Terminal failure for a single topic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("access forbidden (403), topic may be private or restricted")]
    AccessDenied,

    #[error("not found (404), topic may have been deleted")]
    NotFound,

    #[error("rate limited (429)")]
    RateLimited,

    #[error("network error: {0}")]
    Transport(String),

    #[error("JSON decode error: {0}")]
    Decode(String),

    #[error("invalid post_stream structure: {0}")]
    MalformedTopic(#[from] DocumentError),
}

impl AssemblyError {
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::AccessDenied => FailureReason::Forbidden,
            Self::NotFound => FailureReason::NotFound,
            Self::RateLimited => FailureReason::RateLimited,
            Self::Transport(_) => FailureReason::Transport,
            Self::Decode(_) => FailureReason::Decode,
            Self::MalformedTopic(_) => FailureReason::Malformed,
        }
    }
}

impl From<FetchError> for AssemblyError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::AccessDenied => Self::AccessDenied,
            FetchError::NotFound => Self::NotFound,
            FetchError::RateLimited => Self::RateLimited,
            FetchError::Status(code) => Self::Transport(format!("HTTP {}", code)),
            FetchError::Transport(msg) => Self::Transport(msg),
            FetchError::Decode(msg) => Self::Decode(msg),
        }
    }
}

/// Reason code attached to a failed topic in the run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Forbidden,
    NotFound,
    RateLimited,
    Transport,
    Decode,
    Malformed,
    /// The topic was assembled but the store rejected it
    Persist,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Transport => "transport",
            Self::Decode => "decode",
            Self::Malformed => "malformed",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rebuilds complete topics from the base document and batch fetches
#[derive(Debug, Clone)]
pub struct TopicAssembler {
    batch_size: usize,
}

impl Default for TopicAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl TopicAssembler {
    /// Creates an assembler; a `batch_size` of 0 is treated as 1
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Fetches and assembles one topic
    ///
    /// Base document failures are terminal. Batch failures are logged and
    /// leave the affected posts out; check [`Topic::unresolved_posts`].
    pub async fn assemble<S>(&self, source: &S, topic_id: TopicId) -> Result<Topic, AssemblyError>
    where
        S: TopicSource + ?Sized,
    {
        tracing::info!("Fetching initial data for topic {}", topic_id);
        let document = source.topic_document(topic_id).await?;
        let mut topic = Topic::from_document(topic_id, document)?;

        let missing = topic.stream.missing_ids();
        tracing::info!(
            "Topic {}: {} posts in stream, {} initially loaded, {} missing",
            topic_id,
            topic.stream.order.iter().flatten().count(),
            topic.stream.posts.len(),
            missing.len()
        );

        for batch in missing.chunks(self.batch_size) {
            tracing::debug!("Fetching batch of {} posts for topic {}", batch.len(), topic_id);
            match source.post_batch(topic_id, batch).await {
                Ok(response) => {
                    let posts = response.into_posts(topic_id);
                    let added = topic.stream.merge(posts);
                    tracing::debug!("Topic {}: batch added {} posts", topic_id, added);
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to fetch post batch for topic {} ({} posts): {}",
                        topic_id,
                        batch.len(),
                        e
                    );
                }
            }
        }

        let dropped = topic.stream.restore_order();
        if dropped > 0 {
            tracing::debug!(
                "Topic {}: dropped {} posts not referenced by the stream",
                topic_id,
                dropped
            );
        }

        let unresolved = topic.unresolved_posts();
        if !unresolved.is_empty() {
            tracing::warn!(
                "Topic {}: {} posts could not be fetched",
                topic_id,
                unresolved.len()
            );
        }

        Ok(topic)
    }
}
