//! Source catalog clients
//!
//! The catalog supplies the full set of crawlable sources on demand. The
//! coordination engine only reads from it when seeding a sweep.

mod api;
mod static_catalog;

pub use api::ApiCatalog;
pub(crate) use api::base_url;
pub use static_catalog::StaticCatalog;

use crate::config::{CatalogConfig, CatalogKind};
use crate::state::Source;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by catalog clients
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog returned HTTP {0}")]
    Status(u16),

    #[error("Invalid catalog configuration: {0}")]
    Config(String),
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Supplies the crawlable sources
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Every crawlable source
    async fn get_all_sources(&self) -> CatalogResult<Vec<Source>>;

    /// Sources matching the optional category and provider filters, at most `limit`
    async fn get_sources_filtered(
        &self,
        category: Option<&str>,
        provider_type: Option<&str>,
        limit: usize,
    ) -> CatalogResult<Vec<Source>>;
}

/// Builds the catalog selected by configuration
pub fn build_catalog(
    config: &CatalogConfig,
    client: reqwest::Client,
) -> Result<Arc<dyn SourceCatalog>, CatalogError> {
    match config.kind {
        CatalogKind::Static => Ok(Arc::new(StaticCatalog::from_config(config)?)),
        CatalogKind::Api => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| CatalogError::Config("catalog.endpoint is required".to_string()))?;
            Ok(Arc::new(ApiCatalog::new(
                client,
                endpoint,
                config.api_key.clone(),
            )?))
        }
    }
}
