use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::db::analytics_repo::OverviewLimits;

/// Host configuration, read once at startup and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Directory for the raw and structured artifacts of each extraction.
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    #[serde(default = "default_true")]
    pub save_artifacts: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            output_directory: default_output_directory(),
            save_artifacts: true,
            logging: LoggingConfig::default(),
            providers: ProvidersConfig::default(),
            analytics: AnalyticsConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_database_path() -> PathBuf {
    crate::db::default_database_path()
        .unwrap_or_else(|| PathBuf::from(".jobscope").join("data").join("jobs.db"))
}

fn default_output_directory() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join("Downloads"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("extracted_jobs")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `JOBSCOPE_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Append logs here instead of stderr. Never stdout, which carries frames.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

/// Structured-generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    Perplexity,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Perplexity => "perplexity",
        }
    }

    /// Parses the extension's `provider` setting.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "perplexity" => Some(Self::Perplexity),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Used when a request names no provider or an unknown one.
    #[serde(default)]
    pub default_provider: ProviderKind,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub perplexity: PerplexityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "qwen2.5:7b".to_string()
}

fn default_ollama_timeout() -> u64 {
    120
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            model: default_ollama_model(),
            timeout_secs: default_ollama_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerplexityConfig {
    #[serde(default = "default_perplexity_url")]
    pub base_url: String,
    #[serde(default = "default_perplexity_model")]
    pub model: String,
    #[serde(default = "default_perplexity_timeout")]
    pub timeout_secs: u64,
    /// Environment variable holding the API key when a request carries none.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_perplexity_url() -> String {
    "https://api.perplexity.ai".to_string()
}

fn default_perplexity_model() -> String {
    "sonar-pro".to_string()
}

fn default_perplexity_timeout() -> u64 {
    60
}

fn default_api_key_env() -> String {
    "PERPLEXITY_API_KEY".to_string()
}

impl Default for PerplexityConfig {
    fn default() -> Self {
        Self {
            base_url: default_perplexity_url(),
            model: default_perplexity_model(),
            timeout_secs: default_perplexity_timeout(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Result caps for list and analytics actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_top_skills")]
    pub top_skills: u32,
    #[serde(default = "default_per_status")]
    pub skills_per_status: u32,
    #[serde(default = "default_focus_locations")]
    pub focus_locations: u32,
    #[serde(default = "default_list_page_size")]
    pub list_page_size: u32,
    #[serde(default = "default_skill_pairs")]
    pub skill_pairs: u32,
    #[serde(default = "default_top_titles")]
    pub top_titles: u32,
}

fn default_top_skills() -> u32 {
    15
}

fn default_per_status() -> u32 {
    5
}

fn default_focus_locations() -> u32 {
    10
}

fn default_list_page_size() -> u32 {
    100
}

fn default_skill_pairs() -> u32 {
    20
}

fn default_top_titles() -> u32 {
    10
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_skills: default_top_skills(),
            skills_per_status: default_per_status(),
            focus_locations: default_focus_locations(),
            list_page_size: default_list_page_size(),
            skill_pairs: default_skill_pairs(),
            top_titles: default_top_titles(),
        }
    }
}

impl AnalyticsConfig {
    pub fn overview_limits(&self) -> OverviewLimits {
        OverviewLimits {
            top_skills: self.top_skills,
            per_status: self.skills_per_status,
            focus_locations: self.focus_locations,
            top_titles: self.top_titles,
        }
    }
}
