use crate::catalog::{CatalogError, CatalogResult, SourceCatalog};
use crate::state::Source;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Catalog served by the news API (`GET api/sources`)
#[derive(Debug, Clone)]
pub struct ApiCatalog {
    client: Client,
    base: Url,
    api_key: Option<String>,
}

impl ApiCatalog {
    pub fn new(client: Client, endpoint: &str, api_key: Option<String>) -> CatalogResult<Self> {
        let base = base_url(endpoint).map_err(CatalogError::Config)?;
        Ok(Self {
            client,
            base,
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    async fn fetch_sources(&self, url: Url) -> CatalogResult<Vec<Source>> {
        let mut request = self.client.get(url).header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let raw: Vec<Source> = response.json().await?;
        let total = raw.len();

        // Re-validate: the API is not trusted to normalize URLs or hints
        let sources: Vec<Source> = raw
            .into_iter()
            .filter_map(|s| {
                match Source::new(&s.name, &s.url, &s.categories, s.provider.as_deref()) {
                    Ok(source) => Some(source),
                    Err(e) => {
                        tracing::warn!("Skipping catalog entry '{}': {}", s.url, e);
                        None
                    }
                }
            })
            .collect();

        tracing::info!("Retrieved {} of {} sources from catalog API", sources.len(), total);
        Ok(sources)
    }
}

#[async_trait]
impl SourceCatalog for ApiCatalog {
    async fn get_all_sources(&self) -> CatalogResult<Vec<Source>> {
        let url = self
            .base
            .join("api/sources")
            .map_err(|e| CatalogError::Config(e.to_string()))?;
        self.fetch_sources(url).await
    }

    async fn get_sources_filtered(
        &self,
        category: Option<&str>,
        provider_type: Option<&str>,
        limit: usize,
    ) -> CatalogResult<Vec<Source>> {
        let mut url = self
            .base
            .join("api/sources/filter")
            .map_err(|e| CatalogError::Config(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(category) = category.filter(|c| !c.is_empty()) {
                query.append_pair("category", category);
            }
            if let Some(provider) = provider_type.filter(|p| !p.is_empty()) {
                query.append_pair("providerType", provider);
            }
            query.append_pair("limit", &limit.to_string());
        }
        self.fetch_sources(url).await
    }
}

/// Parses an API endpoint so relative paths join beneath it
pub(crate) fn base_url(endpoint: &str) -> Result<Url, String> {
    let mut base = Url::parse(endpoint).map_err(|e| format!("invalid endpoint '{}': {}", endpoint, e))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}
