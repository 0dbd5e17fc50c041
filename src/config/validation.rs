use crate::config::types::{
    Config, CrawlerConfig, ForumConfig, OutputConfig, OutputFormat, UserAgentConfig,
};
use crate::model::DateWindow;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_forum_config(&config.forum)?;
    validate_windows(config)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the forum location
fn validate_forum_config(config: &ForumConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.category_slug.trim().is_empty() {
        return Err(ConfigError::Validation(
            "category-slug cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates both windows parse and are ordered
fn validate_windows(config: &Config) -> Result<(), ConfigError> {
    let w = &config.windows;
    DateWindow::parse(&w.discovery_start, &w.discovery_end)
        .map_err(|e| ConfigError::InvalidDate(format!("discovery window: {}", e)))?;
    DateWindow::parse(&w.filter_start, &w.filter_end)
        .map_err(|e| ConfigError::InvalidDate(format!("filter window: {}", e)))?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > 500 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be between 1 and 500, got {}",
            config.batch_size
        )));
    }

    if config.stale_page_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "stale-page-limit must be >= 1, got {}",
            config.stale_page_limit
        )));
    }

    if config.listing_timeout_secs < 1 || config.batch_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be >= 1s, got listing={}s batch={}s",
            config.listing_timeout_secs, config.batch_timeout_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    match config.format {
        OutputFormat::Json if config.directory.trim().is_empty() => Err(
            ConfigError::Validation("directory cannot be empty".to_string()),
        ),
        OutputFormat::Sqlite
            if config
                .database_path
                .as_deref()
                .map_or(true, |p| p.trim().is_empty()) =>
        {
            Err(ConfigError::Validation(
                "database-path is required when format = \"sqlite\"".to_string(),
            ))
        }
        _ => Ok(()),
    }
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
