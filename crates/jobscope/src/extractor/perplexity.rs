//! Hosted Perplexity backend (OpenAI-style `POST /chat/completions`).

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{http_client, status_error, transport_error, ExtractorConfig, JobExtractor};
use crate::error::ExtractionError;

const PROVIDER: &str = "perplexity";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

pub struct PerplexityExtractor {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl PerplexityExtractor {
    /// Fails with [`ExtractionError::MissingApiKey`] when no key was resolved.
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractionError> {
        let client = http_client(&config)?;
        let api_key = config
            .api_key
            .ok_or_else(|| ExtractionError::MissingApiKey {
                provider: PROVIDER.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
            api_key,
        })
    }
}

#[async_trait]
impl JobExtractor for PerplexityExtractor {
    fn name(&self) -> &str {
        PROVIDER
    }

    #[instrument(skip(self, prompt), fields(provider = PROVIDER, model = %self.model, prompt_len = prompt.len()))]
    async fn extract(&self, prompt: &str) -> Result<String, ExtractionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let body: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| ExtractionError::InvalidEnvelope {
                    provider: PROVIDER.to_string(),
                    detail: e.to_string(),
                })?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ExtractionError::EmptyResponse {
                provider: PROVIDER.to_string(),
            })?;

        debug!(reply_len = choice.message.content.len(), "Perplexity reply received");
        Ok(choice.message.content)
    }
}
