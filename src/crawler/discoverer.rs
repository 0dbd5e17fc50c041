//! Topic discovery over the paginated category listing
//!
//! The listing has no reliable total. Discovery walks pages until one of
//! four exit conditions holds, checked in this order each iteration:
//!
//! 1. the page is empty
//! 2. the stale streak (consecutive pages adding no new id) hits the limit
//! 3. the page carries no continuation marker
//! 4. the page could not be fetched or decoded
//!
//! The stale rule guards against a listing that keeps echoing a
//! continuation marker without new content.

use crate::client::ListingSource;
use crate::model::{DateWindow, InclusionPolicy, TopicId};
use std::collections::BTreeSet;
use std::fmt;

/// Why a discovery pass stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A page came back with no topics
    Exhausted,

    /// Too many consecutive pages added no new topic
    StalePages,

    /// The page had no `more_topics_url`
    LastPage,

    /// A page fetch or decode failed; earlier results are kept
    FetchFailed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => write!(f, "empty page"),
            Self::StalePages => write!(f, "stale page limit reached"),
            Self::LastPage => write!(f, "last page"),
            Self::FetchFailed(e) => write!(f, "page fetch failed: {}", e),
        }
    }
}

/// Result of a discovery pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Qualifying topic ids, each at most once
    pub topic_ids: BTreeSet<TopicId>,

    /// Number of pages successfully fetched
    pub pages_fetched: u32,

    pub stop_reason: StopReason,
}

/// Walks the listing and collects the ids of qualifying topics
#[derive(Debug, Clone)]
pub struct TopicDiscoverer {
    policy: InclusionPolicy,
    stale_page_limit: u32,
}

impl TopicDiscoverer {
    /// Creates a discoverer
    ///
    /// A `stale_page_limit` of 0 is treated as 1.
    pub fn new(policy: InclusionPolicy, stale_page_limit: u32) -> Self {
        Self {
            policy,
            stale_page_limit: stale_page_limit.max(1),
        }
    }

    /// Scans the listing for topics in `window`
    pub async fn discover<S>(&self, source: &S, window: &DateWindow) -> Discovery
    where
        S: ListingSource + ?Sized,
    {
        tracing::info!("Fetching topic ids between {} ({:?})", window, self.policy);

        let mut topic_ids = BTreeSet::new();
        let mut stale_streak = 0u32;
        let mut page = 0u32;
        let mut pages_fetched = 0u32;

        let stop_reason = loop {
            let listing = match source.listing_page(page).await {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::warn!("Failed to fetch listing page {}: {}", page, e);
                    break StopReason::FetchFailed(e.to_string());
                }
            };
            pages_fetched += 1;

            if listing.topics.is_empty() {
                tracing::info!("No more topics found on page {} (empty list)", page);
                break StopReason::Exhausted;
            }

            let before = topic_ids.len();
            for summary in &listing.topics {
                if self.policy.includes(summary, window) {
                    topic_ids.insert(summary.id);
                }
            }

            if topic_ids.len() == before {
                stale_streak += 1;
                tracing::info!(
                    "Page {} did not yield any new topics ({} consecutive stale pages)",
                    page,
                    stale_streak
                );
            } else {
                stale_streak = 0;
            }

            if stale_streak >= self.stale_page_limit {
                tracing::info!(
                    "No new topics for {} consecutive pages, assuming end of relevant listing",
                    self.stale_page_limit
                );
                break StopReason::StalePages;
            }

            if listing.more_topics_url.is_none() {
                tracing::info!("No continuation marker on page {}, this is the last page", page);
                break StopReason::LastPage;
            }

            tracing::info!(
                "Fetched page {}, {} topics on page, {} unique topics so far",
                page,
                listing.topics.len(),
                topic_ids.len()
            );
            page += 1;
        };

        tracing::info!("Total unique topics found in window: {}", topic_ids.len());

        Discovery {
            topic_ids,
            pages_fetched,
            stop_reason,
        }
    }
}
