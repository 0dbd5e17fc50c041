//! Decoding of the batch posts endpoint
//!
//! `t/{id}/posts.json` has been seen answering in three shapes. They are all
//! folded into a flat list here so the assembler only ever sees posts.

use crate::model::topic::{decode_posts, PostRecord, TopicId};
use serde::Deserialize;
use serde_json::Value;

/// The `post_stream` object of the nested shape
#[derive(Debug, Deserialize)]
pub struct NestedPosts {
    pub posts: Vec<Value>,
}

/// The accepted response shapes, tried in order
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PostBatch {
    /// `[post, post, ...]`
    Bare(Vec<Value>),

    /// `{"post_stream": {"posts": [...]}}`
    Nested { post_stream: NestedPosts },

    /// `{"posts": [...]}`
    Flat { posts: Vec<Value> },
}

impl PostBatch {
    /// Decodes a response body into one of the accepted shapes
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Flattens the batch into post records, skipping posts without an id
    pub fn into_posts(self, topic_id: TopicId) -> Vec<PostRecord> {
        let raw = match self {
            Self::Bare(posts) => posts,
            Self::Nested { post_stream } => post_stream.posts,
            Self::Flat { posts } => posts,
        };
        decode_posts(topic_id, raw)
    }
}
