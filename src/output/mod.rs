//! Output module for run summaries and reports
//!
//! This module handles:
//! - The `RunSummary` tally built by the pipeline
//! - Printing summaries and the run ledger to the console
//! - Writing a markdown report of a run

mod markdown;
pub mod stats;
mod summary;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_run_history, print_summary};
pub use summary::{FailedTopic, OutputError, OutputResult, RunSummary};
