//! Console reporting
//!
//! Prints the end-of-run summary and, for `--stats`, the run ledger kept in
//! the SQLite database.

use crate::output::summary::RunSummary;
use crate::storage::RunRecord;

/// Prints a finished run to stdout
///
/// # Arguments
///
/// * `summary` - The run summary to display
/// * `destination` - Where topics were written (directory or database path)
pub fn print_summary(summary: &RunSummary, destination: &str) {
    println!("\n========= SUMMARY =========");
    println!("Discovery window: {}", summary.discovery_window);
    println!("Filter window: {}", summary.filter_window);
    println!(
        "Listing pages fetched: {} ({})",
        summary.pages_fetched,
        summary
            .discovery_stop
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "not run".to_string())
    );
    println!();

    println!("Topics discovered: {}", summary.discovered);
    println!("Topics with posts in filter window: {}", summary.persisted);
    println!("Topics without relevant posts: {}", summary.skipped());
    println!("Failed topics: {}", summary.failed.len());

    if !summary.failed.is_empty() {
        for failed in &summary.failed {
            println!("  - {} ({})", failed.topic_id, failed.reason);
        }
    }

    if !summary.incomplete.is_empty() {
        println!(
            "Topics saved with missing posts ({}): {:?}",
            summary.incomplete.len(),
            summary.incomplete
        );
    }

    if let Some(duration) = summary.duration_seconds() {
        println!("Duration: {} seconds", duration);
    }
    println!("Output: {}", destination);
}

/// Prints the run ledger to stdout, newest run first
pub fn print_run_history(runs: &[RunRecord]) {
    println!("=== Harvest Runs ===\n");

    if runs.is_empty() {
        println!("No runs recorded.");
        return;
    }

    for run in runs {
        println!("Run {} [{}]", run.id, run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Config hash: {}", run.config_hash);
        println!(
            "  Discovered: {}, persisted: {}, skipped: {}, failed: {}",
            run.discovered,
            run.persisted,
            run.skipped,
            run.failed_topics.len()
        );
        if !run.failed_topics.is_empty() {
            let ids: Vec<String> = run
                .failed_topics
                .iter()
                .map(|f| format!("{} ({})", f.topic_id, f.reason))
                .collect();
            println!("  Failed topics: {}", ids.join(", "));
        }
        if !run.incomplete_topics.is_empty() {
            println!("  Incomplete topics: {:?}", run.incomplete_topics);
        }
        println!();
    }
}
