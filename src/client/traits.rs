//! Remote endpoint traits and fetch error types
//!
//! The crawler only talks to the forum through these traits, so discovery
//! and assembly can run against in-memory fakes as easily as against
//! [`ForumClient`](crate::client::ForumClient).

use crate::model::{ListingPage, PostBatch, PostId, TopicId};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors from a single remote call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("access denied (HTTP 403)")]
    AccessDenied,

    #[error("not found (HTTP 404)")]
    NotFound,

    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Maps a non-success HTTP status to its error
    pub fn from_status(status: u16) -> Self {
        match status {
            403 => Self::AccessDenied,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            other => Self::Status(other),
        }
    }
}

/// Result type for remote calls
pub type FetchResult<T> = Result<T, FetchError>;

/// The paginated category listing
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetches listing page `page` (zero-based)
    async fn listing_page(&self, page: u32) -> FetchResult<ListingPage>;
}

/// Per-topic document and batch posts endpoints
#[async_trait]
pub trait TopicSource: Send + Sync {
    /// Fetches the base topic document
    async fn topic_document(&self, topic_id: TopicId) -> FetchResult<Value>;

    /// Fetches the given posts of a topic
    async fn post_batch(&self, topic_id: TopicId, post_ids: &[PostId]) -> FetchResult<PostBatch>;
}
