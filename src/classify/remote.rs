use crate::classify::{match_category, Classifier, ClassifyError, ClassifyResult};
use crate::config::ClassifierConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const MAX_TOKENS: u32 = 30;
const TEMPERATURE: f32 = 0.2;

/// Classifier backed by a completion-style model endpoint
#[derive(Debug, Clone)]
pub struct RemoteClassifier {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    categories: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

impl RemoteClassifier {
    pub fn new(
        client: Client,
        endpoint: &str,
        model: &str,
        api_key: Option<String>,
        categories: Vec<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            categories: categories
                .into_iter()
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &ClassifierConfig, client: Client) -> ClassifyResult<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| ClassifyError::Config("classifier.endpoint is required".to_string()))?;
        let model = config.model.as_deref().unwrap_or("deepseek-chat");

        Ok(Self::new(
            client,
            endpoint,
            model,
            config.api_key.clone(),
            config.categories.clone(),
        ))
    }

    fn prompt(&self, title: &str, content: &str) -> String {
        format!(
            "Classify the following news article into exactly one of these categories: {}.\n\n\
             Title: {}\nSummary: {}\n\n\
             Return only the category name without any explanation or additional text.",
            self.categories.join(", "),
            title,
            content
        )
    }

    async fn complete(&self, prompt: String) -> ClassifyResult<String> {
        let body = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::Status(status.as_u16()));
        }

        let parsed: CompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.text.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .ok_or(ClassifyError::EmptyResponse)
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    async fn classify(
        &self,
        title: &str,
        content: &str,
        source_name: &str,
        category_hint: Option<&str>,
    ) -> ClassifyResult<String> {
        if let Some(mapped) = category_hint.and_then(|h| match_category(h, &self.categories)) {
            tracing::debug!("Mapped hint of {} onto '{}'", source_name, mapped);
            return Ok(mapped);
        }

        let predicted = self.complete(self.prompt(title, content)).await?;
        match_category(&predicted, &self.categories).ok_or(ClassifyError::NoMatch(predicted))
    }
}
