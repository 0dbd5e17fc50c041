//! Configuration module for Thread-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use thread_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Batch size: {}", config.crawler.batch_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AuthConfig, Config, CrawlerConfig, ForumConfig, OutputConfig, OutputFormat, UserAgentConfig,
    WindowsConfig, COOKIE_ENV_VAR,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
