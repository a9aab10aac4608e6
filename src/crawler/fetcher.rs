//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the trawler:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with arbitrary query parameters
//! - Error classification into [`TransportError`]
//!
//! Retrying is not done here; the coordinator wraps every fetch in a
//! [`RetryExecutor`](crate::crawler::RetryExecutor).

use crate::config::{ScraperConfig, UserAgentConfig};
use crate::TransportError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// The fetch collaborator: turns a URL plus query parameters into page text
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &Url, query: &[(String, String)]) -> Result<String, TransportError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use sumi_trawl::config::{ScraperConfig, UserAgentConfig};
/// use sumi_trawl::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SumiTrawl".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, &ScraperConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    scraper: &ScraperConfig,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(scraper.request_timeout))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetch`] over a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url, query: &[(String, String)]) -> Result<String, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: final_url,
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| TransportError::Body {
            url: final_url,
            message: e.to_string(),
        })
    }
}

fn classify(url: &Url, error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransportError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
