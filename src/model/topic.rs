//! Topic documents and their post streams
//!
//! Topics and posts are pass-through documents: only `id`, `created_at` and
//! the `post_stream` skeleton are interpreted, everything else is carried in
//! an insertion-ordered JSON map and written back unchanged.

use crate::model::window::{parse_timestamp, DateWindow, TimestampError};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Identifier of a forum topic
pub type TopicId = u64;

/// Identifier of a single post
pub type PostId = u64;

/// Reasons a topic document cannot be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("document is not a JSON object")]
    NotAnObject,

    #[error("missing or invalid 'post_stream' object")]
    MissingPostStream,

    #[error("missing or invalid 'post_stream.stream' array")]
    MissingStream,

    #[error("missing or invalid 'post_stream.posts' array")]
    MissingPosts,

    #[error("post has no integer 'id'")]
    MissingPostId,
}

/// One post, kept field-for-field as the forum returned it
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    id: PostId,
    fields: Map<String, Value>,
}

impl PostRecord {
    /// Wraps a raw post object; the object must carry an integer `id`
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let Value::Object(fields) = value else {
            return Err(DocumentError::MissingPostId);
        };
        let id = fields
            .get("id")
            .and_then(Value::as_u64)
            .ok_or(DocumentError::MissingPostId)?;
        Ok(Self { id, fields })
    }

    pub fn id(&self) -> PostId {
        self.id
    }

    /// The raw `created_at` string, if present
    pub fn created_at_raw(&self) -> Option<&str> {
        self.fields.get("created_at").and_then(Value::as_str)
    }

    /// Returns true if the post's creation time parses and lies in `window`
    ///
    /// A missing `created_at` counts as a parse failure.
    pub fn created_in(&self, window: &DateWindow) -> Result<bool, TimestampError> {
        let raw = self.created_at_raw().unwrap_or_default();
        parse_timestamp(raw).map(|t| window.contains(t))
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl Serialize for PostRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// The canonical post ordering of a topic plus the post bodies loaded so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostStream {
    /// Canonical post ids; `None` marks a gap the forum reported as null
    pub order: Vec<Option<PostId>>,

    /// Post bodies, unique by id
    pub posts: Vec<PostRecord>,
}

impl PostStream {
    /// Ids referenced by `order` that have no loaded post, in stream order
    pub fn missing_ids(&self) -> Vec<PostId> {
        let loaded: HashSet<PostId> = self.posts.iter().map(PostRecord::id).collect();
        let mut seen = HashSet::new();
        self.order
            .iter()
            .flatten()
            .copied()
            .filter(|id| !loaded.contains(id) && seen.insert(*id))
            .collect()
    }

    /// Appends posts whose id is not loaded yet; returns how many were added
    ///
    /// The first record seen for an id always wins.
    pub fn merge(&mut self, fetched: Vec<PostRecord>) -> usize {
        let mut loaded: HashSet<PostId> = self.posts.iter().map(PostRecord::id).collect();
        let before = self.posts.len();
        for post in fetched {
            if loaded.insert(post.id()) {
                self.posts.push(post);
            }
        }
        self.posts.len() - before
    }

    /// Rearranges `posts` to follow `order`
    ///
    /// Ids without a record are skipped. Posts not referenced by `order` are
    /// dropped; the number dropped is returned.
    pub fn restore_order(&mut self) -> usize {
        let total = self.posts.len();
        let mut by_id: HashMap<PostId, PostRecord> = self
            .posts
            .drain(..)
            .map(|post| (post.id(), post))
            .collect();
        let mut ordered = Vec::with_capacity(total);
        for id in self.order.iter().flatten() {
            if let Some(post) = by_id.remove(id) {
                ordered.push(post);
            }
        }
        self.posts = ordered;
        total - self.posts.len()
    }
}

/// A topic document with its post stream split out for processing
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    id: TopicId,
    pub stream: PostStream,
    /// Every other key of the document, in original order. The
    /// `post_stream` entry keeps its position and any extra keys, with
    /// `stream` and `posts` emptied until serialization.
    fields: Map<String, Value>,
}

impl Topic {
    /// Splits a raw topic document into the stream and pass-through fields
    ///
    /// Individual posts without an integer id are skipped with a warning.
    pub fn from_document(id: TopicId, document: Value) -> Result<Self, DocumentError> {
        let Value::Object(mut fields) = document else {
            return Err(DocumentError::NotAnObject);
        };
        let post_stream = fields
            .get_mut("post_stream")
            .and_then(Value::as_object_mut)
            .ok_or(DocumentError::MissingPostStream)?;

        let order = match post_stream.get_mut("stream").map(Value::take) {
            Some(Value::Array(entries)) => entries.iter().map(Value::as_u64).collect(),
            _ => return Err(DocumentError::MissingStream),
        };
        let raw_posts = match post_stream.get_mut("posts").map(Value::take) {
            Some(Value::Array(posts)) => posts,
            _ => return Err(DocumentError::MissingPosts),
        };
        // Keep the key positions for serialization
        post_stream.insert("stream".to_string(), Value::Array(Vec::new()));
        post_stream.insert("posts".to_string(), Value::Array(Vec::new()));

        let mut stream = PostStream {
            order,
            posts: Vec::with_capacity(raw_posts.len()),
        };
        let initial = decode_posts(id, raw_posts);
        stream.merge(initial);

        Ok(Self {
            id,
            stream,
            fields,
        })
    }

    pub fn id(&self) -> TopicId {
        self.id
    }

    /// The topic title, when the document has one
    pub fn title(&self) -> Option<&str> {
        self.fields.get("title").and_then(Value::as_str)
    }

    /// Ids in the canonical stream that still have no post body
    pub fn unresolved_posts(&self) -> Vec<PostId> {
        self.stream.missing_ids()
    }

    /// Rebuilds the full document with the current stream
    pub fn to_document(&self) -> Value {
        let mut document = self.fields.clone();
        let order: Vec<Value> = self
            .stream
            .order
            .iter()
            .map(|id| id.map_or(Value::Null, Value::from))
            .collect();
        let posts: Vec<Value> = self
            .stream
            .posts
            .iter()
            .map(|post| Value::Object(post.fields().clone()))
            .collect();

        if let Some(post_stream) = document
            .get_mut("post_stream")
            .and_then(Value::as_object_mut)
        {
            post_stream.insert("stream".to_string(), Value::Array(order));
            post_stream.insert("posts".to_string(), Value::Array(posts));
        }
        Value::Object(document)
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

/// Converts raw post values, skipping (and logging) those without an id
pub(crate) fn decode_posts(topic_id: TopicId, raw: Vec<Value>) -> Vec<PostRecord> {
    raw.into_iter()
        .filter_map(|value| match PostRecord::from_value(value) {
            Ok(post) => Some(post),
            Err(e) => {
                tracing::warn!("Topic {}: skipping post: {}", topic_id, e);
                None
            }
        })
        .collect()
}
