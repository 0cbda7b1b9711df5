//! Category classification
//!
//! Classifiers map an article onto one of the configured category labels.
//! The pipeline never lets a classifier failure reach the article: see
//! [`classify_with_fallback`].

mod remote;
mod rules;

pub use remote::RemoteClassifier;
pub use rules::RuleClassifier;

use crate::config::{ClassifierConfig, ClassifierKind};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Classifier request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Classifier returned HTTP {0}")]
    Status(u16),

    #[error("Classifier returned no choices")]
    EmptyResponse,

    #[error("No category matched '{0}'")]
    NoMatch(String),

    #[error("Invalid classifier configuration: {0}")]
    Config(String),
}

pub type ClassifyResult<T> = Result<T, ClassifyError>;

/// Assigns a category label to an article
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        title: &str,
        content: &str,
        source_name: &str,
        category_hint: Option<&str>,
    ) -> ClassifyResult<String>;
}

/// Maps a free-form label onto one of `categories`
///
/// Exact case-insensitive match wins; otherwise the first category that
/// contains, or is contained in, the candidate. Returned labels are lowercase.
pub fn match_category(candidate: &str, categories: &[String]) -> Option<String> {
    let candidate = candidate.trim().to_lowercase();
    if candidate.is_empty() {
        return None;
    }

    if let Some(exact) = categories
        .iter()
        .find(|c| c.trim().eq_ignore_ascii_case(&candidate))
    {
        return Some(exact.trim().to_lowercase());
    }

    categories
        .iter()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .find(|c| candidate.contains(c.as_str()) || c.contains(candidate.as_str()))
}

/// Runs `classifier` bounded by `timeout`, substituting `fallback` on any failure
pub async fn classify_with_fallback(
    classifier: &dyn Classifier,
    timeout: Duration,
    fallback: &str,
    title: &str,
    content: &str,
    source_name: &str,
    category_hint: Option<&str>,
) -> String {
    let call = classifier.classify(title, content, source_name, category_hint);
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(label)) if !label.trim().is_empty() => label,
        Ok(Ok(_)) => {
            tracing::warn!("Classifier returned an empty label for '{}', using '{}'", title, fallback);
            fallback.to_string()
        }
        Ok(Err(e)) => {
            tracing::warn!("Classification failed for '{}': {}, using '{}'", title, e, fallback);
            fallback.to_string()
        }
        Err(_) => {
            tracing::warn!(
                "Classification of '{}' timed out after {:?}, using '{}'",
                title,
                timeout,
                fallback
            );
            fallback.to_string()
        }
    }
}

/// Builds the classifier selected by configuration
pub fn build_classifier(
    config: &ClassifierConfig,
    client: reqwest::Client,
) -> ClassifyResult<Arc<dyn Classifier>> {
    match config.kind {
        ClassifierKind::Rules => Ok(Arc::new(RuleClassifier::from_config(config))),
        ClassifierKind::Remote => Ok(Arc::new(RemoteClassifier::from_config(config, client)?)),
    }
}
