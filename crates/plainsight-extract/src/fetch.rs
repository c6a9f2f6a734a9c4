//! Document fetching
//!
//! The scanner never talks to the network directly; it asks a
//! [`DocumentFetcher`] for the policy document. [`HttpFetcher`] is the
//! reqwest-backed implementation used by the CLI.

use crate::{config::ExtractorConfig, error::Result, ExtractError};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// A fetched document body plus the response metadata extractors care about
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub body: T,
    pub content_type: Option<String>,
}

/// Retrieves the text or bytes behind a URL
#[async_trait::async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch a document as text
    async fn fetch_text(&self, url: &str) -> Result<Fetched<String>>;

    /// Fetch a document as raw bytes
    async fn fetch_bytes(&self, url: &str) -> Result<Fetched<Vec<u8>>>;
}

/// HTTP document fetcher
pub struct HttpFetcher {
    config: ExtractorConfig,
    client: Client,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(config.max_redirects)
            } else {
                reqwest::redirect::Policy::none()
            })
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ExtractError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let url = url::Url::parse(url).map_err(|_| ExtractError::InvalidUrl(url.to_string()))?;
        debug!(%url, "fetching document");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ExtractError::from_reqwest(e, self.config.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Http {
                status: status.as_u16(),
                message: status.to_string(),
            });
        }

        if let Some(len) = response.content_length() {
            self.check_size(len as usize)?;
        }

        Ok(response)
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.config.max_length {
            return Err(ExtractError::ContentTooLarge {
                size,
                max: self.config.max_length,
            });
        }
        Ok(())
    }
}

fn content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[async_trait::async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<Fetched<String>> {
        let response = self.get(url).await?;
        let content_type = content_type(&response);
        let body = response
            .text()
            .await
            .map_err(|e| ExtractError::from_reqwest(e, self.config.timeout_secs))?;
        self.check_size(body.len())?;
        Ok(Fetched { body, content_type })
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Fetched<Vec<u8>>> {
        let response = self.get(url).await?;
        let content_type = content_type(&response);
        let body = response
            .bytes()
            .await
            .map_err(|e| ExtractError::from_reqwest(e, self.config.timeout_secs))?;
        self.check_size(body.len())?;
        Ok(Fetched {
            body: body.to_vec(),
            content_type,
        })
    }
}
