use crate::model::{DateWindow, InclusionPolicy, WindowError};
use serde::Deserialize;

/// Environment variable that overrides `[auth] cookie`
pub const COOKIE_ENV_VAR: &str = "THREAD_HARVEST_COOKIE";

/// Main configuration structure for Thread-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub forum: ForumConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub windows: WindowsConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Window used to decide which topics to examine at all
    pub fn discovery_window(&self) -> Result<DateWindow, WindowError> {
        DateWindow::parse(&self.windows.discovery_start, &self.windows.discovery_end)
    }

    /// Window used to decide which posts end up in the output
    pub fn filter_window(&self) -> Result<DateWindow, WindowError> {
        DateWindow::parse(&self.windows.filter_start, &self.windows.filter_end)
    }

    /// The session cookie string, with the environment taking precedence
    ///
    /// A blank variable counts as unset and falls back to `[auth] cookie`.
    pub fn cookie(&self) -> Option<String> {
        resolve_cookie(std::env::var(COOKIE_ENV_VAR).ok(), self.auth.cookie.as_deref())
    }
}

fn resolve_cookie(from_env: Option<String>, from_file: Option<&str>) -> Option<String> {
    from_env
        .filter(|c| !c.trim().is_empty())
        .or_else(|| from_file.map(str::to_string))
        .filter(|c| !c.trim().is_empty())
}

/// Which forum and category to harvest
#[derive(Debug, Clone, Deserialize)]
pub struct ForumConfig {
    /// Forum root, e.g. "https://forum.example.org/"
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Category slug as it appears in `/c/{slug}/{id}`
    #[serde(rename = "category-slug")]
    pub category_slug: String,

    #[serde(rename = "category-id")]
    pub category_id: u64,
}

/// Opaque session material attached to every request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Raw `Cookie` header value copied from a logged-in browser session
    #[serde(default)]
    pub cookie: Option<String>,
}

/// Discovery and filter windows, as `YYYY-MM-DD` dates or RFC 3339 instants
#[derive(Debug, Clone, Deserialize)]
pub struct WindowsConfig {
    #[serde(rename = "discovery-start")]
    pub discovery_start: String,

    #[serde(rename = "discovery-end")]
    pub discovery_end: String,

    #[serde(rename = "filter-start")]
    pub filter_start: String,

    #[serde(rename = "filter-end")]
    pub filter_end: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Which listing entries qualify for discovery
    pub inclusion: InclusionPolicy,

    /// Number of post ids requested per batch fetch
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Consecutive listing pages without new topics before discovery stops
    #[serde(rename = "stale-page-limit")]
    pub stale_page_limit: u32,

    /// Pause between topic assemblies (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Timeout for listing and topic requests (seconds)
    #[serde(rename = "listing-timeout-secs")]
    pub listing_timeout_secs: u64,

    /// Timeout for batch post requests (seconds)
    #[serde(rename = "batch-timeout-secs")]
    pub batch_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            inclusion: InclusionPolicy::default(),
            batch_size: 50,
            stale_page_limit: 5,
            request_delay_ms: 1000,
            listing_timeout_secs: 30,
            batch_timeout_secs: 60,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Where harvested topics go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// One `topic_{id}.json` file per topic
    #[default]
    Json,

    /// Rows in a SQLite database, with a run ledger
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Directory for JSON topic files
    #[serde(default = "default_directory")]
    pub directory: String,

    /// Path to the SQLite database file
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,

    /// Path to the markdown run report
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

fn default_directory() -> String {
    "discourse_json".to_string()
}
