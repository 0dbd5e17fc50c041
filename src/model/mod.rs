//! Data model for the harvester
//!
//! # Components
//!
//! - `DateWindow`: inclusive UTC interval used by every filtering decision
//! - `Topic`, `PostStream`, `PostRecord`: pass-through forum documents
//! - `ListingPage`, `TopicSummary`, `InclusionPolicy`: category listing pages
//! - `PostBatch`: the batch posts endpoint's accepted response shapes

mod batch;
mod listing;
mod topic;
mod window;

pub use batch::PostBatch;
pub use listing::{InclusionPolicy, ListingPage, TopicSummary};
pub use topic::{DocumentError, PostId, PostRecord, PostStream, Topic, TopicId};
pub use window::{parse_timestamp, DateWindow, TimestampError, WindowError};
