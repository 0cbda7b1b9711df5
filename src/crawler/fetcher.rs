//! HTTP fetcher
//!
//! Builds the shared HTTP client and fetches feed and article documents.
//! Every failure is mapped to a `SweepError` carrying the URL so the pipeline
//! can log it and report the source with zero articles.

use crate::config::{UserAgentConfig, WorkerConfig};
use crate::SweepError;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Maximum redirect hops followed for a single document
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use newsweep::config::{UserAgentConfig, WorkerConfig};
/// use newsweep::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "newsweep".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, &WorkerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    worker: &WorkerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.user_agent_string())
        .timeout(Duration::from_secs(worker.fetch_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a document body, failing on transport errors and non-2xx statuses
pub async fn fetch_document(client: &Client, url: &str) -> Result<String, SweepError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SweepError::Http {
            url: url.to_string(),
            source: e,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SweepError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|e| SweepError::Http {
        url: url.to_string(),
        source: e,
    })
}
