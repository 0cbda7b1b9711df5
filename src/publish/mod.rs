//! Article publishers
//!
//! A publisher accepts finished articles and per-worker statistics. Publish
//! failures never abort a sweep; they only lower the success count a source
//! reports back to the coordinator.

mod api;
mod schema;
mod sqlite;

pub use api::ApiPublisher;
pub use schema::{get_schema_version, initialize_schema};
pub use sqlite::SqlitePublisher;

use crate::config::{PublisherConfig, PublisherKind};
use crate::state::Article;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by publishers
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Publish request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Publish endpoint returned HTTP {0}")]
    Status(u16),

    #[error("Invalid publisher configuration: {0}")]
    Config(String),
}

pub type PublishResult<T> = Result<T, PublishError>;

/// Accepts articles and crawler statistics
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes one article, returning whether it was accepted
    async fn publish_one(&self, article: &Article) -> bool;

    /// Publishes a batch, returning how many articles were accepted
    async fn publish_batch(&self, articles: &[Article]) -> usize {
        let mut published = 0;
        for article in articles {
            if self.publish_one(article).await {
                published += 1;
            }
        }
        published
    }

    /// Records running totals for a worker
    async fn report_stats(
        &self,
        worker_id: &str,
        sources_processed: u64,
        articles_published: u64,
    ) -> PublishResult<()>;
}

/// Builds the publisher selected by configuration
pub fn build_publisher(
    config: &PublisherConfig,
    client: reqwest::Client,
) -> PublishResult<Arc<dyn Publisher>> {
    match config.kind {
        PublisherKind::Sqlite => Ok(Arc::new(SqlitePublisher::new(Path::new(
            &config.database_path,
        ))?)),
        PublisherKind::Api => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| PublishError::Config("publisher.endpoint is required".to_string()))?;
            Ok(Arc::new(ApiPublisher::new(
                client,
                endpoint,
                config.api_key.clone(),
            )?))
        }
    }
}
