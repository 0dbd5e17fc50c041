//! Markdown run report
//!
//! Writes a human-readable report of a finished run: windows, counters,
//! failed topics with their reason codes, and incomplete topics.

use crate::output::summary::{OutputResult, RunSummary};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown report for a run
///
/// # Arguments
///
/// * `summary` - The run summary
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn generate_markdown_summary(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let mut md = String::new();

    md.push_str("# Thread-Harvest Run Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    if let Some(finished) = summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = summary.duration_seconds() {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Config Hash**: {}\n", summary.config_hash));
    md.push_str(&format!(
        "- **Discovery Window**: {}\n",
        summary.discovery_window
    ));
    md.push_str(&format!("- **Filter Window**: {}\n\n", summary.filter_window));

    md.push_str("## Discovery\n\n");
    md.push_str(&format!("- **Listing Pages**: {}\n", summary.pages_fetched));
    if let Some(stop) = &summary.discovery_stop {
        md.push_str(&format!("- **Stopped On**: {}\n", stop));
    }
    md.push('\n');

    md.push_str("## Topics\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Discovered | {} |\n", summary.discovered));
    md.push_str(&format!("| Persisted | {} |\n", summary.persisted));
    md.push_str(&format!("| No relevant posts | {} |\n", summary.skipped()));
    md.push_str(&format!("| Failed | {} |\n\n", summary.failed.len()));

    if !summary.failed.is_empty() {
        md.push_str("## Failed Topics\n\n");
        md.push_str("| Topic | Reason |\n");
        md.push_str("|-------|--------|\n");
        for failed in &summary.failed {
            md.push_str(&format!("| {} | {} |\n", failed.topic_id, failed.reason));
        }
        md.push('\n');
    }

    if !summary.incomplete.is_empty() {
        md.push_str("## Incomplete Topics\n\n");
        md.push_str("Saved with posts that could not be fetched:\n\n");
        for topic_id in &summary.incomplete {
            md.push_str(&format!("- {}\n", topic_id));
        }
        md.push('\n');
    }

    md
}
