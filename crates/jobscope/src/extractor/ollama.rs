//! Local Ollama backend (`POST /api/generate`, JSON mode).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{http_client, status_error, transport_error, ExtractorConfig, JobExtractor};
use crate::error::ExtractionError;

const PROVIDER: &str = "ollama";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaExtractor {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaExtractor {
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractionError> {
        let client = http_client(&config)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
        })
    }
}

#[async_trait]
impl JobExtractor for OllamaExtractor {
    fn name(&self) -> &str {
        PROVIDER
    }

    #[instrument(skip(self, prompt), fields(provider = PROVIDER, model = %self.model, prompt_len = prompt.len()))]
    async fn extract(&self, prompt: &str) -> Result<String, ExtractionError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let body: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| ExtractionError::InvalidEnvelope {
                    provider: PROVIDER.to_string(),
                    detail: e.to_string(),
                })?;

        debug!(reply_len = body.response.len(), "Ollama reply received");
        Ok(body.response)
    }
}
