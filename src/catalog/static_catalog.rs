use crate::catalog::{CatalogError, CatalogResult, SourceCatalog};
use crate::config::CatalogConfig;
use crate::state::Source;
use async_trait::async_trait;

/// Catalog backed by the `[[catalog.sources]]` entries of the config file
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    sources: Vec<Source>,
}

impl StaticCatalog {
    pub fn new(sources: Vec<Source>) -> Self {
        // Later duplicates of the same URL are dropped
        let mut unique: Vec<Source> = Vec::with_capacity(sources.len());
        for source in sources {
            if !unique.iter().any(|s| s.key() == source.key()) {
                unique.push(source);
            }
        }
        Self { sources: unique }
    }

    pub fn from_config(config: &CatalogConfig) -> CatalogResult<Self> {
        let sources = config
            .sources
            .iter()
            .map(|entry| {
                Source::new(
                    &entry.name,
                    &entry.url,
                    &entry.categories,
                    entry.provider.as_deref(),
                )
                .map_err(|e| CatalogError::Config(e.to_string()))
            })
            .collect::<CatalogResult<Vec<_>>>()?;

        Ok(Self::new(sources))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl SourceCatalog for StaticCatalog {
    async fn get_all_sources(&self) -> CatalogResult<Vec<Source>> {
        Ok(self.sources.clone())
    }

    async fn get_sources_filtered(
        &self,
        category: Option<&str>,
        provider_type: Option<&str>,
        limit: usize,
    ) -> CatalogResult<Vec<Source>> {
        let matches = self
            .sources
            .iter()
            .filter(|s| category.map_or(true, |c| s.has_category(c)))
            .filter(|s| {
                provider_type.map_or(true, |p| {
                    s.provider
                        .as_deref()
                        .is_some_and(|own| own.eq_ignore_ascii_case(p))
                })
            })
            .take(limit)
            .cloned()
            .collect();

        Ok(matches)
    }
}
