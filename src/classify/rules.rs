use crate::classify::{match_category, Classifier, ClassifyError, ClassifyResult};
use crate::config::ClassifierConfig;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Offline classifier driven by source hints and keyword lists
///
/// Resolution order:
/// 1. the source's category hint mapped onto the valid categories
/// 2. the category whose keywords occur most often (title hits count double)
///
/// With no categories configured the hint itself is the label.
#[derive(Debug, Clone, Default)]
pub struct RuleClassifier {
    categories: Vec<String>,
    keywords: BTreeMap<String, Vec<String>>,
}

impl RuleClassifier {
    pub fn new(categories: Vec<String>, keywords: BTreeMap<String, Vec<String>>) -> Self {
        let categories = categories
            .into_iter()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        let keywords = keywords
            .into_iter()
            .map(|(category, words)| {
                let words = words
                    .into_iter()
                    .map(|w| w.trim().to_lowercase())
                    .filter(|w| !w.is_empty())
                    .collect();
                (category.trim().to_lowercase(), words)
            })
            .collect();

        Self {
            categories,
            keywords,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.categories.clone(), config.keywords.clone())
    }

    fn score(&self, title: &str, content: &str) -> Option<String> {
        let title = title.to_lowercase();
        let content = content.to_lowercase();

        let mut best: Option<(&str, usize)> = None;
        for category in &self.categories {
            let Some(words) = self.keywords.get(category) else {
                continue;
            };
            let score: usize = words
                .iter()
                .map(|w| 2 * title.matches(w.as_str()).count() + content.matches(w.as_str()).count())
                .sum();

            // Ties keep the earlier category
            if score > 0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((category.as_str(), score));
            }
        }

        best.map(|(category, _)| category.to_string())
    }
}

#[async_trait]
impl Classifier for RuleClassifier {
    async fn classify(
        &self,
        title: &str,
        content: &str,
        _source_name: &str,
        category_hint: Option<&str>,
    ) -> ClassifyResult<String> {
        let hint = category_hint.map(str::trim).filter(|h| !h.is_empty());

        if self.categories.is_empty() {
            return hint
                .map(str::to_lowercase)
                .ok_or_else(|| ClassifyError::NoMatch(title.to_string()));
        }

        if let Some(mapped) = hint.and_then(|h| match_category(h, &self.categories)) {
            return Ok(mapped);
        }

        self.score(title, content)
            .ok_or_else(|| ClassifyError::NoMatch(title.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RuleClassifier {
        let mut keywords = BTreeMap::new();
        keywords.insert(
            "Technology".to_string(),
            vec!["software".to_string(), "chip".to_string()],
        );
        keywords.insert("sports".to_string(), vec!["match".to_string()]);
        RuleClassifier::new(
            vec!["world".to_string(), "technology".to_string(), "sports".to_string()],
            keywords,
        )
    }

    #[tokio::test]
    async fn test_hint_wins() {
        let label = classifier()
            .classify("Chip shortage", "", "Daily", Some("World News"))
            .await
            .unwrap();
        assert_eq!(label, "world");
    }

    #[tokio::test]
    async fn test_keywords_scored() {
        let label = classifier()
            .classify("New chip announced", "The match was about software", "Daily", None)
            .await
            .unwrap();
        assert_eq!(label, "technology");
    }

    #[tokio::test]
    async fn test_no_match_is_error() {
        let result = classifier()
            .classify("Rain expected", "Cloudy", "Daily", Some("weather"))
            .await;
        assert!(matches!(result, Err(ClassifyError::NoMatch(_))));
    }

    #[tokio::test]
    async fn test_no_categories_uses_hint() {
        let classifier = RuleClassifier::default();
        assert_eq!(
            classifier.classify("t", "c", "s", Some("Local")).await.unwrap(),
            "local"
        );
        assert!(classifier.classify("t", "c", "s", None).await.is_err());
    }
}
