//! Resource retrieval.
//!
//! The [`Fetcher`] trait isolates transport: the engine only sees raw
//! content or a [`WatchError::Fetch`]. [`HttpFetcher`] is the reqwest-backed
//! implementation with a bounded per-request timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, WatchError};
use crate::types::ResourceId;

const MAX_REDIRECTS: usize = 5;

/// Retrieves raw content for a resource.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the raw body for `id`. Any transport-level failure is returned
    /// as [`WatchError::Fetch`].
    async fn fetch(&self, id: &ResourceId) -> Result<String>;
}

/// HTTP(S) fetcher.
pub struct HttpFetcher {
    client: Client,
    user_agent: String,
}

impl HttpFetcher {
    /// Create a fetcher with the given per-request timeout.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| WatchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }

    /// Create a fetcher from engine configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            Duration::from_secs(config.fetch_timeout_secs),
            &config.user_agent,
        )
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, id: &ResourceId) -> Result<String> {
        let url = parse_url(id)?;

        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| WatchError::Fetch(describe_request_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::Fetch(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| WatchError::Fetch(format!("Failed to read response body: {}", e)))?;

        debug!("Fetched {} ({} bytes)", id, body.len());
        Ok(body)
    }
}

/// Parse and check that `id` is an http/https URL.
pub fn parse_url(id: &ResourceId) -> Result<Url> {
    let url = Url::parse(id.as_str())
        .map_err(|e| WatchError::Fetch(format!("Invalid URL '{}': {}", id, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(WatchError::Fetch(format!(
            "Unsupported URL scheme '{}' (only http/https)",
            other
        ))),
    }
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else if e.is_redirect() {
        format!("too many redirects: {}", e)
    } else {
        format!("request failed: {}", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ResourceId {
        ResourceId::new(s).unwrap()
    }

    #[test]
    fn test_parse_url_accepts_http() {
        assert!(parse_url(&id("http://example.com")).is_ok());
        assert!(parse_url(&id("https://example.com/a?b=c")).is_ok());
    }

    #[test]
    fn test_parse_url_rejects_other_schemes() {
        let err = parse_url(&id("file:///etc/passwd")).unwrap_err();
        assert!(matches!(err, WatchError::Fetch(_)));
        assert!(err.to_string().contains("file"));
    }

    #[test]
    fn test_parse_url_rejects_garbage() {
        let err = parse_url(&id("not a url")).unwrap_err();
        assert!(err.is_fetch());
    }

    #[test]
    fn test_from_config() {
        let config = Config::default();
        assert!(HttpFetcher::from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_invalid_url_is_fetch_error() {
        let fetcher = HttpFetcher::new(Duration::from_secs(1), "test").unwrap();
        let err = fetcher.fetch(&id("mailto:someone@example.com")).await.unwrap_err();
        assert!(matches!(err, WatchError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_fetch_error() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2), "test").unwrap();
        // Port 9 on loopback is almost never listening.
        let err = fetcher.fetch(&id("http://127.0.0.1:9/")).await.unwrap_err();
        assert!(matches!(err, WatchError::Fetch(_)));
    }
}
