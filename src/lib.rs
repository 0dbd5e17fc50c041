//! Thread-Harvest: a windowed Discourse topic harvester
//!
//! This crate discovers forum topics inside a date window, rebuilds each
//! topic's full post list from the paginated JSON API, and keeps only the
//! posts that fall inside a (possibly narrower) filter window before handing
//! the result to a topic store.

pub mod client;
pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for run-level Thread-Harvest failures
///
/// Per-topic and per-page failures never surface here; they are absorbed or
/// tallied by the pipeline.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid session cookie: {0}")]
    InvalidCookie(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Date window error: {0}")]
    Window(#[from] model::WindowError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid date in config: {0}")]
    InvalidDate(String),
}

/// Result type alias for Thread-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Pipeline, PostFilter, TopicAssembler, TopicDiscoverer};
pub use model::{DateWindow, InclusionPolicy, PostRecord, Topic, TopicId};
pub use output::RunSummary;
