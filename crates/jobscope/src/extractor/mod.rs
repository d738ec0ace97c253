//! Structured-generation providers.
//!
//! Every provider takes the same prompt and hands back the model's reply
//! text untouched. Turning that text into a [`crate::model::JobRecord`] is
//! the job of [`crate::normalize`], not of the provider.

mod config;
pub mod ollama;
pub mod perplexity;
pub mod prompt;

use async_trait::async_trait;

pub use config::ExtractorConfig;
pub use ollama::OllamaExtractor;
pub use perplexity::PerplexityExtractor;
pub use prompt::build_prompt;

use crate::config::ProviderKind;
use crate::error::ExtractionError;

/// A backend that answers an extraction prompt with reply text.
#[async_trait]
pub trait JobExtractor: Send + Sync {
    /// Provider name used in logs and error messages.
    fn name(&self) -> &str;

    /// Sends the prompt and returns the model's reply text.
    async fn extract(&self, prompt: &str) -> Result<String, ExtractionError>;
}

/// Builds the provider selected by `config`.
pub fn build_extractor(config: ExtractorConfig) -> Result<Box<dyn JobExtractor>, ExtractionError> {
    Ok(match config.provider {
        ProviderKind::Ollama => Box::new(OllamaExtractor::new(config)?),
        ProviderKind::Perplexity => Box::new(PerplexityExtractor::new(config)?),
    })
}

/// HTTP client with the per-provider request timeout applied.
fn http_client(config: &ExtractorConfig) -> Result<reqwest::Client, ExtractionError> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| ExtractionError::Transport {
            provider: config.provider.to_string(),
            detail: format!("failed to build HTTP client: {}", e),
        })
}

/// Maps a reqwest failure, calling out timeouts explicitly.
fn transport_error(provider: &str, err: reqwest::Error) -> ExtractionError {
    let detail = if err.is_timeout() {
        format!("timed out: {}", err)
    } else {
        err.to_string()
    };
    ExtractionError::Transport {
        provider: provider.to_string(),
        detail,
    }
}

/// Reads a non-success response into [`ExtractionError::Status`].
async fn status_error(provider: &str, response: reqwest::Response) -> ExtractionError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ExtractionError::Status {
        provider: provider.to_string(),
        status,
        body: truncate(&body, 512),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
