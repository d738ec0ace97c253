use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::config::{ProviderKind, ProvidersConfig};
use crate::error::ExtractionError;
use crate::protocol::ExtractSettings;
use crate::sanitize::redact_secret;

/// Everything a provider needs, fixed at construction.
///
/// Built once per request by merging the extension's settings over the
/// host configuration; providers never look at settings or the
/// environment themselves.
#[derive(Debug)]
pub struct ExtractorConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub api_key: Option<SecretString>,
}

impl ExtractorConfig {
    /// Merges request settings over the configured provider defaults.
    ///
    /// An empty or unrecognized `provider` falls back to the configured
    /// default. The Perplexity key comes from the request, else from the
    /// configured environment variable.
    pub fn resolve(
        settings: &ExtractSettings,
        providers: &ProvidersConfig,
    ) -> Result<Self, ExtractionError> {
        let requested = settings.provider.trim();
        let provider = match ProviderKind::parse(requested) {
            Some(kind) => kind,
            None => {
                if !requested.is_empty() {
                    log::warn!(
                        "Unknown provider '{}', using {}",
                        requested,
                        providers.default_provider
                    );
                }
                providers.default_provider
            }
        };

        let config = match provider {
            ProviderKind::Ollama => {
                let c = &providers.ollama;
                Self {
                    provider,
                    base_url: c.base_url.clone(),
                    model: pick(&settings.ollama_model, &c.model),
                    timeout: Duration::from_secs(c.timeout_secs),
                    api_key: None,
                }
            }
            ProviderKind::Perplexity => {
                let c = &providers.perplexity;
                let key = non_empty(&settings.perplexity_key)
                    .map(str::to_string)
                    .or_else(|| {
                        std::env::var(&c.api_key_env)
                            .ok()
                            .filter(|k| !k.trim().is_empty())
                    })
                    .ok_or_else(|| ExtractionError::MissingApiKey {
                        provider: provider.to_string(),
                    })?;
                Self {
                    provider,
                    base_url: c.base_url.clone(),
                    model: pick(&settings.perplexity_model, &c.model),
                    timeout: Duration::from_secs(c.timeout_secs),
                    api_key: Some(SecretString::from(key.trim().to_string())),
                }
            }
        };

        log::debug!(
            "Extractor resolved: provider={} model={} timeout={}s key={}",
            config.provider,
            config.model,
            config.timeout.as_secs(),
            config
                .api_key
                .as_ref()
                .map(|k| redact_secret(k.expose_secret()))
                .unwrap_or_else(|| "none".to_string())
        );
        Ok(config)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn pick(requested: &str, fallback: &str) -> String {
    non_empty(requested).unwrap_or(fallback).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn settings(provider: &str) -> ExtractSettings {
        ExtractSettings {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ollama_defaults() {
        let config = ExtractorConfig::resolve(&settings("ollama"), &ProvidersConfig::default())
            .unwrap();
        assert_eq!(config.provider, ProviderKind::Ollama);
        assert_eq!(config.model, "qwen2.5:7b");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_request_model_overrides_default() {
        let mut s = settings("ollama");
        s.ollama_model = "llama3.1:8b".to_string();
        let config = ExtractorConfig::resolve(&s, &ProvidersConfig::default()).unwrap();
        assert_eq!(config.model, "llama3.1:8b");
    }

    #[test]
    fn test_unknown_provider_uses_default() {
        let config =
            ExtractorConfig::resolve(&settings("gpt"), &ProvidersConfig::default()).unwrap();
        assert_eq!(config.provider, ProviderKind::Ollama);
    }

    #[test]
    fn test_perplexity_key_from_request() {
        let mut s = settings("perplexity");
        s.perplexity_key = " pplx-123 ".to_string();
        let config = ExtractorConfig::resolve(&s, &ProvidersConfig::default()).unwrap();
        assert_eq!(config.model, "sonar-pro");
        assert_eq!(config.api_key.unwrap().expose_secret(), "pplx-123");
    }

    #[test]
    #[serial]
    fn test_perplexity_key_from_env() {
        let mut providers = ProvidersConfig::default();
        providers.perplexity.api_key_env = "JOBSCOPE_TEST_PPLX_KEY".to_string();
        std::env::set_var("JOBSCOPE_TEST_PPLX_KEY", "pplx-env");

        let config = ExtractorConfig::resolve(&settings("perplexity"), &providers).unwrap();
        std::env::remove_var("JOBSCOPE_TEST_PPLX_KEY");

        assert_eq!(config.api_key.unwrap().expose_secret(), "pplx-env");
    }

    #[test]
    #[serial]
    fn test_perplexity_without_key_fails() {
        let mut providers = ProvidersConfig::default();
        providers.perplexity.api_key_env = "JOBSCOPE_TEST_UNSET_KEY".to_string();
        std::env::remove_var("JOBSCOPE_TEST_UNSET_KEY");

        let err = ExtractorConfig::resolve(&settings("perplexity"), &providers).unwrap_err();
        assert!(matches!(err, ExtractionError::MissingApiKey { .. }));
        assert_eq!(err.provider(), "perplexity");
    }

    #[test]
    fn test_debug_output_hides_key() {
        let mut s = settings("perplexity");
        s.perplexity_key = "pplx-secret-value".to_string();
        let config = ExtractorConfig::resolve(&s, &ProvidersConfig::default()).unwrap();
        assert!(!format!("{:?}", config).contains("pplx-secret-value"));
    }
}
