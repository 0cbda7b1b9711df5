use crate::catalog::base_url;
use crate::publish::{PublishError, PublishResult, Publisher};
use crate::state::Article;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

/// Publishes articles and stats to the news API
#[derive(Debug, Clone)]
pub struct ApiPublisher {
    client: Client,
    base: Url,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchPublishResult {
    #[serde(default)]
    success_count: usize,
    #[serde(default)]
    failed_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CrawlerStats<'a> {
    crawler_name: &'a str,
    sources_processed: u64,
    articles_published: u64,
    timestamp: DateTime<Utc>,
}

impl ApiPublisher {
    pub fn new(client: Client, endpoint: &str, api_key: Option<String>) -> PublishResult<Self> {
        Ok(Self {
            client,
            base: base_url(endpoint).map_err(PublishError::Config)?,
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    fn post(&self, path: &str) -> PublishResult<RequestBuilder> {
        let url = self
            .base
            .join(path)
            .map_err(|e| PublishError::Config(e.to_string()))?;
        let mut request = self.client.post(url).header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }
        Ok(request)
    }

    async fn send_batch(&self, articles: &[Article]) -> PublishResult<BatchPublishResult> {
        let response = self.post("api/articles/batch")?.json(articles).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Publisher for ApiPublisher {
    async fn publish_one(&self, article: &Article) -> bool {
        let request = match self.post("api/articles") {
            Ok(request) => request,
            Err(e) => {
                tracing::error!("Cannot publish '{}': {}", article.title, e);
                return false;
            }
        };

        match request.json(article).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Published article: {}", article.title);
                true
            }
            Ok(response) => {
                tracing::warn!(
                    "Failed to publish article '{}': HTTP {}",
                    article.title,
                    response.status()
                );
                false
            }
            Err(e) => {
                tracing::warn!("Error publishing article '{}': {}", article.title, e);
                false
            }
        }
    }

    async fn publish_batch(&self, articles: &[Article]) -> usize {
        if articles.is_empty() {
            return 0;
        }

        match self.send_batch(articles).await {
            Ok(result) => {
                tracing::info!(
                    "Published {} articles in batch, {} failed",
                    result.success_count,
                    result.failed_count
                );
                result.success_count.min(articles.len())
            }
            Err(e) => {
                tracing::warn!("Failed to publish batch of {} articles: {}", articles.len(), e);
                0
            }
        }
    }

    async fn report_stats(
        &self,
        worker_id: &str,
        sources_processed: u64,
        articles_published: u64,
    ) -> PublishResult<()> {
        let stats = CrawlerStats {
            crawler_name: worker_id,
            sources_processed,
            articles_published,
            timestamp: Utc::now(),
        };

        let response = self.post("api/crawlers/stats")?.json(&stats).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Status(status.as_u16()));
        }
        Ok(())
    }
}
