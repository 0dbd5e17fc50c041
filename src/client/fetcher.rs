//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building HTTP clients with proper user agent strings
//! - Attaching the opaque session cookie to every request
//! - Building the listing, topic and batch post endpoint URLs
//! - Error classification (403/404/429, transport, decode)
//!
//! Nothing here retries; a failed call is reported once and the caller
//! decides whether it is absorbed or terminal.

use crate::client::traits::{FetchError, FetchResult, ListingSource, TopicSource};
use crate::config::{Config, UserAgentConfig};
use crate::model::{ListingPage, PostBatch, PostId, TopicId};
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `cookie` - Raw `Cookie` header value, attached to every request as-is
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(HarvestError)` - The cookie is not a valid header value, or the
///   client could not be built
pub fn build_http_client(
    config: &UserAgentConfig,
    cookie: Option<&str>,
) -> Result<Client, HarvestError> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    let mut headers = HeaderMap::new();
    if let Some(cookie) = cookie {
        let mut value = HeaderValue::from_str(cookie.trim())
            .map_err(|e| HarvestError::InvalidCookie(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(COOKIE, value);
    }

    let client = Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;
    Ok(client)
}

/// Client for one forum category's JSON endpoints
#[derive(Debug, Clone)]
pub struct ForumClient {
    client: Client,
    base_url: Url,
    category_slug: String,
    category_id: u64,
    listing_timeout: Duration,
    batch_timeout: Duration,
}

impl ForumClient {
    /// Creates a client from the loaded configuration
    ///
    /// Logs a warning when no cookie is configured, since private categories
    /// will then answer 403 or return empty listings.
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let cookie = config.cookie();
        if cookie.is_none() {
            tracing::warn!(
                "No session cookie configured; requests may fail for private forums or categories"
            );
        }
        let client = build_http_client(&config.user_agent, cookie.as_deref())?;
        Self::with_client(
            client,
            &config.forum.base_url,
            &config.forum.category_slug,
            config.forum.category_id,
        )
        .map(|c| {
            c.with_timeouts(
                Duration::from_secs(config.crawler.listing_timeout_secs),
                Duration::from_secs(config.crawler.batch_timeout_secs),
            )
        })
    }

    /// Creates a client around an existing `reqwest::Client`
    pub fn with_client(
        client: Client,
        base_url: &str,
        category_slug: &str,
        category_id: u64,
    ) -> Result<Self, HarvestError> {
        // Url::join replaces the last segment unless the base ends with '/'
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            category_slug: category_slug.trim_matches('/').to_string(),
            category_id,
            listing_timeout: Duration::from_secs(30),
            batch_timeout: Duration::from_secs(60),
        })
    }

    /// Overrides the per-request timeouts
    pub fn with_timeouts(mut self, listing: Duration, batch: Duration) -> Self {
        self.listing_timeout = listing;
        self.batch_timeout = batch;
        self
    }

    /// `c/{slug}/{id}.json?page={page}`
    pub fn listing_url(&self, page: u32) -> Result<Url, FetchError> {
        let mut url = self.join(&format!(
            "c/{}/{}.json",
            self.category_slug, self.category_id
        ))?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string());
        Ok(url)
    }

    /// `t/{id}.json`
    pub fn topic_url(&self, topic_id: TopicId) -> Result<Url, FetchError> {
        self.join(&format!("t/{}.json", topic_id))
    }

    /// `t/{id}/posts.json?post_ids[]=..&post_ids[]=..`
    pub fn post_batch_url(&self, topic_id: TopicId, post_ids: &[PostId]) -> Result<Url, FetchError> {
        let mut url = self.join(&format!("t/{}/posts.json", topic_id))?;
        {
            let mut query = url.query_pairs_mut();
            for id in post_ids {
                query.append_pair("post_ids[]", &id.to_string());
            }
        }
        Ok(url)
    }

    fn join(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path)
            .map_err(|e| FetchError::Transport(format!("invalid endpoint {}: {}", path, e)))
    }

    /// Sends a GET and returns the body of a successful response
    async fn get_body(&self, url: Url, timeout: Duration) -> FetchResult<Vec<u8>> {
        tracing::trace!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_transport(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport(&url, e))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl ListingSource for ForumClient {
    async fn listing_page(&self, page: u32) -> FetchResult<ListingPage> {
        let url = self.listing_url(page)?;
        let body = self.get_body(url, self.listing_timeout).await?;
        ListingPage::from_json(&body).map_err(|e| decode_error(&body, e))
    }
}

#[async_trait]
impl TopicSource for ForumClient {
    async fn topic_document(&self, topic_id: TopicId) -> FetchResult<Value> {
        let url = self.topic_url(topic_id)?;
        let body = self.get_body(url, self.listing_timeout).await?;
        serde_json::from_slice(&body).map_err(|e| decode_error(&body, e))
    }

    async fn post_batch(&self, topic_id: TopicId, post_ids: &[PostId]) -> FetchResult<PostBatch> {
        let url = self.post_batch_url(topic_id, post_ids)?;
        let body = self.get_body(url, self.batch_timeout).await?;
        PostBatch::from_json(&body).map_err(|e| decode_error(&body, e))
    }
}

fn classify_transport(url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Transport(format!("request timeout for {}", url))
    } else if e.is_connect() {
        FetchError::Transport(format!("connection failed for {}", url))
    } else {
        FetchError::Transport(e.to_string())
    }
}

// Includes the start of the body, which is usually an HTML error page
fn decode_error(body: &[u8], e: serde_json::Error) -> FetchError {
    let preview: String = String::from_utf8_lossy(body).chars().take(200).collect();
    FetchError::Decode(format!("{} (content: {})", e, preview))
}
