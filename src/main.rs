//! Thread-Harvest main entry point
//!
//! This is the command-line interface for the Thread-Harvest topic harvester.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use thread_harvest::client::ForumClient;
use thread_harvest::config::{load_config_with_hash, Config, OutputFormat};
use thread_harvest::crawler::{harvest, inspect_topic, PostFilter, TopicAssembler};
use thread_harvest::output::{generate_markdown_summary, print_run_history, print_summary};
use thread_harvest::storage::SqliteStore;
use thread_harvest::TopicId;
use tracing_subscriber::EnvFilter;

/// Thread-Harvest: a windowed Discourse topic harvester
///
/// Thread-Harvest discovers the topics of one forum category that were
/// created (or active) inside a date window, downloads every post of each
/// topic, and saves the posts that fall inside a filter window.
#[derive(Parser, Debug)]
#[command(name = "thread-harvest")]
#[command(version)]
#[command(about = "A windowed Discourse topic harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long, conflicts_with_all = ["stats", "topic"])]
    dry_run: bool,

    /// Show the run history from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "topic"])]
    stats: bool,

    /// Fetch a single topic and report its posts without saving it
    #[arg(long, value_name = "ID", conflicts_with_all = ["dry_run", "stats"])]
    topic: Option<TopicId>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if let Some(topic_id) = cli.topic {
        handle_topic(&config, topic_id).await
    } else {
        handle_harvest(&config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("thread_harvest=info,warn"),
            1 => EnvFilter::new("thread_harvest=debug,info"),
            2 => EnvFilter::new("thread_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Human-readable output destination for the configured format
fn destination(config: &Config) -> String {
    match config.output.format {
        OutputFormat::Json => config.output.directory.clone(),
        OutputFormat::Sqlite => config
            .output
            .database_path
            .clone()
            .unwrap_or_default(),
    }
}

/// Handles the --dry-run mode: validates config and shows what would be fetched
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let client = ForumClient::from_config(config)?;

    println!("=== Thread-Harvest Dry Run ===\n");

    println!("Forum:");
    println!("  Base URL: {}", config.forum.base_url);
    println!(
        "  Category: {} ({})",
        config.forum.category_slug, config.forum.category_id
    );
    println!("  Listing endpoint: {}", client.listing_url(0)?);
    println!(
        "  Session cookie: {}",
        if config.cookie().is_some() {
            "configured"
        } else {
            "none"
        }
    );

    println!("\nWindows:");
    println!("  Discovery: {}", config.discovery_window()?);
    println!("  Filter: {}", config.filter_window()?);

    println!("\nCrawler Configuration:");
    println!("  Inclusion: {:?}", config.crawler.inclusion);
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Stale page limit: {}", config.crawler.stale_page_limit);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!(
        "  Timeouts: listing {}s, batch {}s",
        config.crawler.listing_timeout_secs, config.crawler.batch_timeout_secs
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Format: {:?}", config.output.format);
    println!("  Destination: {}", destination(config));
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows the run ledger from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let Some(path) = config.output.database_path.as_deref() else {
        bail!("--stats needs output.database-path to point at a harvest database");
    };
    if !Path::new(path).exists() {
        bail!("Database {} does not exist", path);
    }

    println!("Database: {}\n", path);

    let store = SqliteStore::new(Path::new(path))
        .with_context(|| format!("Failed to open database {}", path))?;
    let runs = store.list_runs()?;
    print_run_history(&runs);
    println!("Topics stored: {}", store.count_topics()?);

    Ok(())
}

/// Handles the --topic mode: assembles one topic and reports on it
async fn handle_topic(config: &Config, topic_id: TopicId) -> anyhow::Result<()> {
    let client = ForumClient::from_config(config)?;
    let assembler = TopicAssembler::new(config.crawler.batch_size);
    let filter = PostFilter::new(config.filter_window()?);

    let inspection = inspect_topic(&client, &assembler, &filter, topic_id)
        .await
        .with_context(|| format!("Failed to assemble topic {}", topic_id))?;

    println!(
        "Topic {}: {}",
        topic_id,
        inspection.topic.title().unwrap_or("(untitled)")
    );
    println!("  Posts assembled: {}", inspection.assembled_posts);
    println!(
        "  Posts in filter window ({}): {}",
        filter.window(),
        inspection.relevant_posts
    );
    if !inspection.unresolved.is_empty() {
        println!(
            "  Posts that could not be fetched ({}): {:?}",
            inspection.unresolved.len(),
            inspection.unresolved
        );
    }
    if inspection.relevant_posts == 0 {
        println!("  Topic would be skipped");
    } else {
        println!("  Topic would be saved");
    }

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting {} category {} ({})",
        config.forum.base_url,
        config.forum.category_slug,
        config.forum.category_id
    );

    let summary = match harvest(config, config_hash).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    print_summary(&summary, &destination(config));

    if let Some(path) = &config.output.summary_path {
        generate_markdown_summary(&summary, Path::new(path))
            .with_context(|| format!("Failed to write summary to {}", path))?;
        println!("Summary written to: {}", path);
    }

    Ok(())
}
