//! Per-source pipeline: fetch -> parse -> extract -> classify -> publish
//!
//! Failures are contained at the narrowest scope. A bad item is skipped, a
//! bad source yields zero articles, and a failing classifier yields the
//! fallback label.

use crate::classify::{classify_with_fallback, Classifier};
use crate::config::{ClassifierConfig, WorkerConfig};
use crate::crawler::extract::{extract_content, strip_markup};
use crate::crawler::feed::{parse_feed, parse_pub_date, FeedItem};
use crate::crawler::fetcher::fetch_document;
use crate::publish::Publisher;
use crate::state::{Article, Source};
use crate::SweepError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Processes one leased source, returning the number of articles published
#[async_trait]
pub trait SourceProcessor: Send + Sync {
    async fn process(&self, source: &Source) -> u64;
}

/// Tunables of the per-source pipeline
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_items: usize,
    pub fetch_full_content: bool,
    pub classifier_timeout: Duration,
    pub fallback_label: String,
}

impl PipelineSettings {
    pub fn from_config(worker: &WorkerConfig, classifier: &ClassifierConfig) -> Self {
        Self {
            max_items: worker.max_items_per_source,
            fetch_full_content: worker.fetch_full_content,
            classifier_timeout: Duration::from_secs(classifier.timeout_secs),
            fallback_label: classifier.fallback_label.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_items: 20,
            fetch_full_content: false,
            classifier_timeout: Duration::from_secs(10),
            fallback_label: "uncategorized".to_string(),
        }
    }
}

/// Result of running the pipeline over one source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOutcome {
    /// Articles built from the feed
    pub extracted: usize,
    /// Articles the publisher accepted
    pub published: usize,
}

pub struct SourcePipeline {
    client: Client,
    classifier: Arc<dyn Classifier>,
    publisher: Arc<dyn Publisher>,
    settings: PipelineSettings,
}

impl SourcePipeline {
    pub fn new(
        client: Client,
        classifier: Arc<dyn Classifier>,
        publisher: Arc<dyn Publisher>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            client,
            classifier,
            publisher,
            settings,
        }
    }

    /// Runs the whole pipeline; never fails
    pub async fn run(&self, source: &Source) -> SourceOutcome {
        let articles = match self.collect_articles(source).await {
            Ok(articles) => articles,
            Err(e) => {
                tracing::warn!("Source {} failed: {}", source.name, e);
                return SourceOutcome::default();
            }
        };

        if articles.is_empty() {
            tracing::info!("Source {} produced no articles", source.name);
            return SourceOutcome::default();
        }

        let published = self.publisher.publish_batch(&articles).await;
        if published < articles.len() {
            tracing::warn!(
                "Source {}: published {} of {} articles",
                source.name,
                published,
                articles.len()
            );
        } else {
            tracing::info!("Source {}: published {} articles", source.name, published);
        }

        SourceOutcome {
            extracted: articles.len(),
            published,
        }
    }

    /// Fetches the feed and builds its articles without publishing them
    pub async fn collect_articles(&self, source: &Source) -> Result<Vec<Article>, SweepError> {
        let base = Url::parse(&source.url)
            .map_err(|e| SweepError::InvalidSource(format!("{}: {}", source.url, e)))?;

        let body = fetch_document(&self.client, &source.url).await?;
        let items = parse_feed(&body).map_err(|message| SweepError::FeedParse {
            url: source.url.clone(),
            message,
        })?;

        tracing::debug!("Source {}: {} items in feed", source.name, items.len());

        let mut articles = Vec::new();
        for item in items.into_iter().take(self.settings.max_items) {
            if let Some(article) = self.build_article(source, &base, item).await {
                articles.push(article);
            }
        }

        Ok(articles)
    }

    async fn build_article(&self, source: &Source, base: &Url, item: FeedItem) -> Option<Article> {
        let title = item.title.as_deref().map(strip_markup).unwrap_or_default();
        if title.is_empty() {
            tracing::debug!("Skipping item without title in {}", source.name);
            return None;
        }

        let link = item.link.as_deref().map(str::trim).unwrap_or_default();
        if link.is_empty() {
            tracing::debug!("Skipping item '{}' without link in {}", title, source.name);
            return None;
        }
        let url = match base.join(link) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::debug!("Skipping item '{}' with bad link '{}': {}", title, link, e);
                return None;
            }
        };

        let published_at = item
            .pub_date
            .as_deref()
            .and_then(parse_pub_date)
            .unwrap_or_else(Utc::now);

        let summary = item
            .description
            .as_deref()
            .map(strip_markup)
            .unwrap_or_default();

        let content = if self.settings.fetch_full_content {
            self.full_content(&url).await.unwrap_or_else(|| summary.clone())
        } else {
            summary.clone()
        };

        // The item's own category wins over the source-level hint
        let hint = item.category.as_deref().or(source.primary_category());
        let category = classify_with_fallback(
            self.classifier.as_ref(),
            self.settings.classifier_timeout,
            &self.settings.fallback_label,
            &title,
            &content,
            &source.name,
            hint,
        )
        .await;

        Some(Article {
            id: Uuid::new_v4(),
            title,
            summary,
            content,
            url,
            source_name: source.name.clone(),
            source_url: source.url.clone(),
            category,
            published_at,
            crawled_at: Utc::now(),
        })
    }

    /// Body text of the article page, if it can be fetched and extracted
    async fn full_content(&self, url: &str) -> Option<String> {
        match fetch_document(&self.client, url).await {
            Ok(html) => extract_content(&html),
            Err(e) => {
                tracing::debug!("Falling back to summary for {}: {}", url, e);
                None
            }
        }
    }
}

#[async_trait]
impl SourceProcessor for SourcePipeline {
    async fn process(&self, source: &Source) -> u64 {
        self.run(source).await.published as u64
    }
}
