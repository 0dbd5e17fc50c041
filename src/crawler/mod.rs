//! Crawler module for topic harvesting
//!
//! This module contains the core harvesting logic, including:
//! - Topic discovery over the paginated category listing
//! - Topic assembly from the base document and batched post fetches
//! - Post filtering by creation date
//! - Overall run orchestration

mod assembler;
mod discoverer;
mod filter;
mod pipeline;

pub use assembler::{AssemblyError, FailureReason, TopicAssembler, DEFAULT_BATCH_SIZE};
pub use discoverer::{Discovery, StopReason, TopicDiscoverer};
pub use filter::PostFilter;
pub use pipeline::{inspect_topic, Pipeline, TopicInspection};

use crate::client::ForumClient;
use crate::config::Config;
use crate::output::RunSummary;
use crate::storage::open_store;
use crate::HarvestError;

/// Runs a complete harvest
///
/// This is the main entry point for a run. It will:
/// 1. Build the forum client with the configured cookie
/// 2. Open the configured topic store
/// 3. Discover, assemble, filter and persist topics
/// 4. Record the run and return its summary
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `config_hash` - Hash of the configuration file, recorded with the run
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run completed (individual topics may have failed)
/// * `Err(HarvestError)` - The run could not start
///
/// # Example
///
/// ```no_run
/// use thread_harvest::config::load_config_with_hash;
/// use thread_harvest::crawler::harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("harvest.toml"))?;
/// let summary = harvest(&config, &hash).await?;
/// println!("{} topics saved", summary.persisted);
/// # Ok(())
/// # }
/// ```
pub async fn harvest(config: &Config, config_hash: &str) -> Result<RunSummary, HarvestError> {
    let client = ForumClient::from_config(config)?;
    let store = open_store(&config.output)?;
    let mut pipeline = Pipeline::from_config(config, config_hash, client, store)?;
    pipeline.run().await
}
