//! Post-level date filtering
//!
//! Reduces an assembled topic to the posts created inside the filter window.
//! The surviving posts keep their assembled order and the stream is cut down
//! to the same ids in their original stream order.

use crate::model::{DateWindow, PostId, PostRecord, Topic};
use std::collections::HashSet;

/// Keeps only posts created inside a date window
#[derive(Debug, Clone)]
pub struct PostFilter {
    window: DateWindow,
}

impl PostFilter {
    pub fn new(window: DateWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    /// Returns true if at least one post of `topic` lies in the window
    pub fn is_relevant(&self, topic: &Topic) -> bool {
        topic.stream.posts.iter().any(|post| self.keeps(topic, post))
    }

    /// Filters `topic` and returns it with the number of posts kept
    ///
    /// A count of 0 means the topic is irrelevant and should be discarded.
    /// Posts whose `created_at` does not parse are dropped.
    pub fn apply(&self, mut topic: Topic) -> (Topic, usize) {
        let posts = std::mem::take(&mut topic.stream.posts);
        let kept: Vec<PostRecord> = posts
            .into_iter()
            .filter(|post| self.keeps(&topic, post))
            .collect();

        let surviving: HashSet<PostId> = kept.iter().map(PostRecord::id).collect();
        topic
            .stream
            .order
            .retain(|id| id.is_some_and(|id| surviving.contains(&id)));
        topic.stream.posts = kept;

        let count = topic.stream.posts.len();
        tracing::debug!(
            "Topic {}: {} posts inside {}",
            topic.id(),
            count,
            self.window
        );
        (topic, count)
    }

    fn keeps(&self, topic: &Topic, post: &PostRecord) -> bool {
        match post.created_in(&self.window) {
            Ok(inside) => inside,
            Err(e) => {
                tracing::debug!(
                    "Topic {}: excluding post {}: {}",
                    topic.id(),
                    post.id(),
                    e
                );
                false
            }
        }
    }
}
