use crate::SweepError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// A single feed endpoint to be crawled
///
/// Identity is the fetch URL. Sources are read-only for the coordination
/// engine: it leases them, it never creates or mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Display name
    pub name: String,

    /// Feed URL (unique key)
    pub url: String,

    /// Category hints declared by the source, lowercased
    #[serde(default)]
    pub categories: Vec<String>,

    /// Provider label (e.g. "rss")
    #[serde(default, alias = "providerType", skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl Source {
    /// Creates a validated source
    ///
    /// The URL must parse and use the http or https scheme. Category hints are
    /// trimmed, lowercased and de-duplicated; blank hints are dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use newsweep::Source;
    ///
    /// let source = Source::new("Example", "https://example.com/rss", &[" World "], None).unwrap();
    /// assert_eq!(source.key(), "https://example.com/rss");
    /// assert_eq!(source.categories, vec!["world".to_string()]);
    /// ```
    pub fn new<S: AsRef<str>>(
        name: &str,
        url: &str,
        categories: &[S],
        provider: Option<&str>,
    ) -> Result<Self, SweepError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SweepError::InvalidSource(
                "source name cannot be empty".to_string(),
            ));
        }

        let parsed = Url::parse(url.trim())
            .map_err(|e| SweepError::InvalidSource(format!("invalid url '{}': {}", url, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(SweepError::InvalidSource(format!(
                "source url must be http or https, got '{}'",
                url
            )));
        }

        let mut hints: Vec<String> = Vec::new();
        for category in categories {
            let hint = category.as_ref().trim().to_lowercase();
            if !hint.is_empty() && !hints.contains(&hint) {
                hints.push(hint);
            }
        }

        Ok(Self {
            name: name.to_string(),
            url: parsed.as_str().to_string(),
            categories: hints,
            provider: provider
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        })
    }

    /// The identity of this source
    pub fn key(&self) -> &str {
        &self.url
    }

    /// The first declared category hint, if any
    pub fn primary_category(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }

    /// Returns true if the source declares the given category (case-insensitive)
    pub fn has_category(&self, category: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category.trim()))
    }
}

/// An article produced by a source pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    /// Markup-free feed summary
    pub summary: String,
    /// Extracted body text, or the summary when extraction was disabled or empty
    pub content: String,
    /// Link to the article itself
    pub url: String,
    pub source_name: String,
    pub source_url: String,
    pub category: String,
    pub published_at: DateTime<Utc>,
    pub crawled_at: DateTime<Utc>,
}
