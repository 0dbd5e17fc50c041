//! Category listing pages and the topic inclusion policy

use crate::model::topic::TopicId;
use crate::model::window::{parse_timestamp, DateWindow};
use serde::Deserialize;
use serde_json::Value;

/// One entry of a category listing page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopicSummary {
    pub id: TopicId,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_posted_at: Option<String>,
}

/// A decoded listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub topics: Vec<TopicSummary>,

    /// Continuation marker; `None` means this is the last page
    pub more_topics_url: Option<String>,
}

#[derive(Deserialize)]
struct ListingResponse {
    #[serde(default)]
    topic_list: Option<TopicListBody>,
}

#[derive(Deserialize)]
struct TopicListBody {
    #[serde(default)]
    topics: Option<Vec<Value>>,
    #[serde(default)]
    more_topics_url: Option<String>,
}

impl ListingPage {
    /// Decodes a `c/{slug}/{id}.json` response body
    ///
    /// A body without `topic_list`, or with missing or null `topics`, decodes
    /// as an empty page. Entries that do not decode are skipped one by one.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let response: ListingResponse = serde_json::from_slice(body)?;
        Ok(response
            .topic_list
            .map(|list| ListingPage {
                topics: list
                    .topics
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(decode_summary)
                    .collect(),
                more_topics_url: list.more_topics_url.filter(|url| !url.is_empty()),
            })
            .unwrap_or_default())
    }
}

fn decode_summary(raw: Value) -> Option<TopicSummary> {
    match serde_json::from_value(raw) {
        Ok(summary) => Some(summary),
        Err(e) => {
            tracing::warn!("Skipping malformed listing entry: {}", e);
            None
        }
    }
}

/// Which topics a discovery pass keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InclusionPolicy {
    /// Keep topics created inside the window
    Created,

    /// Also keep older topics whose last post lands inside the window
    #[default]
    CreatedOrActive,
}

impl InclusionPolicy {
    /// Applies the policy to one summary
    ///
    /// Unparseable or missing timestamps never qualify; bad values are
    /// logged with the topic id.
    pub fn includes(&self, summary: &TopicSummary, window: &DateWindow) -> bool {
        if timestamp_in(summary.id, "created_at", summary.created_at.as_deref(), window) {
            return true;
        }
        match self {
            Self::Created => false,
            Self::CreatedOrActive => {
                let active = timestamp_in(
                    summary.id,
                    "last_posted_at",
                    summary.last_posted_at.as_deref(),
                    window,
                );
                if active {
                    tracing::info!(
                        "Including topic {} due to recent activity (last post: {})",
                        summary.id,
                        summary.last_posted_at.as_deref().unwrap_or_default()
                    );
                }
                active
            }
        }
    }
}

fn timestamp_in(topic_id: TopicId, field: &str, raw: Option<&str>, window: &DateWindow) -> bool {
    let Some(raw) = raw else {
        return false;
    };
    match parse_timestamp(raw) {
        Ok(t) => window.contains(t),
        Err(e) => {
            tracing::warn!("Topic {}: could not parse {}: {}", topic_id, field, e);
            false
        }
    }
}
