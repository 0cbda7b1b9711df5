//! Crawler module: feed fetching, per-source pipelines and the worker loop
//!
//! This module contains:
//! - HTTP fetching of feeds and article pages
//! - Namespace-tolerant feed parsing
//! - Markup stripping and article body extraction
//! - The fetch -> extract -> classify -> publish pipeline
//! - The worker loop that leases sources and runs pipelines in parallel

mod extract;
mod feed;
mod fetcher;
mod pipeline;
mod worker;

pub use extract::{collapse_whitespace, extract_content, strip_markup};
pub use feed::{parse_feed, parse_pub_date, FeedItem};
pub use fetcher::{build_http_client, fetch_document};
pub use pipeline::{PipelineSettings, SourceOutcome, SourcePipeline, SourceProcessor};
pub use worker::{SweepTotals, Worker};

use crate::catalog::build_catalog;
use crate::classify::build_classifier;
use crate::config::Config;
use crate::coordination::Coordinator;
use crate::publish::build_publisher;
use crate::SweepError;
use std::sync::Arc;

/// Connects the configured coordinator and its source catalog
pub async fn build_coordinator(config: &Config) -> Result<Coordinator, SweepError> {
    let client = build_http_client(&config.user_agent, &config.worker)?;
    let catalog = build_catalog(&config.catalog, client)?;
    Ok(Coordinator::from_config(&config.coordination, catalog).await?)
}

/// Wires a worker from configuration
///
/// Returns the coordinator alongside the worker so callers keep access to
/// backend-specific views.
pub async fn build_worker(config: &Config) -> Result<(Coordinator, Worker), SweepError> {
    let client = build_http_client(&config.user_agent, &config.worker)?;

    let catalog = build_catalog(&config.catalog, client.clone())?;
    let coordinator = Coordinator::from_config(&config.coordination, catalog).await?;
    let classifier = build_classifier(&config.classifier, client.clone())?;
    let publisher = build_publisher(&config.publisher, client.clone())?;

    let pipeline = SourcePipeline::new(
        client,
        classifier,
        Arc::clone(&publisher),
        PipelineSettings::from_config(&config.worker, &config.classifier),
    );

    let worker = Worker::new(
        &config.worker,
        coordinator.as_dyn(),
        Arc::new(pipeline),
        publisher,
    );

    Ok((coordinator, worker))
}
