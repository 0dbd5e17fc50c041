//! Forum client module
//!
//! This module contains everything that touches the network:
//! - The `ListingSource` and `TopicSource` traits the crawler depends on
//! - `ForumClient`, the reqwest implementation of both
//! - `FetchError`, the classification of a failed call

mod fetcher;
mod traits;

pub use fetcher::{build_http_client, ForumClient};
pub use traits::{FetchError, FetchResult, ListingSource, TopicSource};
