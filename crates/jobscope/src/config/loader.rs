use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "JOBSCOPE_CONFIG";
pub const DB_PATH_ENV: &str = "JOBSCOPE_DB_PATH";
pub const OUTPUT_DIR_ENV: &str = "JOBSCOPE_OUTPUT_DIR";
pub const OLLAMA_BASE_ENV: &str = "OLLAMA_BASE";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// `$JOBSCOPE_CONFIG`, else `~/.jobscope/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => dirs::home_dir().map(|h| h.join(".jobscope").join("config.json")),
    }
}

/// Loads the config file if it exists, otherwise starts from defaults.
/// Environment overrides are applied on top either way.
///
/// A file that exists but does not parse or validate is an error; the host
/// must not silently fall back to defaults in that case.
pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) if path.exists() => {
            log::debug!("Loading config from {}", path.display());
            load_config(path)?
        }
        _ => Config::default(),
    };

    apply_env_overrides(&mut config);
    validate_config(&config)?;
    Ok(config)
}

/// Applies `JOBSCOPE_DB_PATH`, `JOBSCOPE_OUTPUT_DIR` and `OLLAMA_BASE`.
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(path) = non_empty_env(DB_PATH_ENV) {
        config.database_path = PathBuf::from(path);
    }
    if let Some(dir) = non_empty_env(OUTPUT_DIR_ENV) {
        config.output_directory = PathBuf::from(dir);
    }
    if let Some(base) = non_empty_env(OLLAMA_BASE_ENV) {
        config.providers.ollama.base_url = base;
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |message: String| Err(ConfigError::Validation { message });

    if config.database_path.as_os_str().is_empty() {
        return invalid("database_path must not be empty".to_string());
    }
    if config.output_directory.as_os_str().is_empty() {
        return invalid("output_directory must not be empty".to_string());
    }
    if config.logging.level.trim().is_empty() {
        return invalid("logging.level must not be empty".to_string());
    }

    let providers = &config.providers;
    for (name, url, model, timeout) in [
        (
            "ollama",
            &providers.ollama.base_url,
            &providers.ollama.model,
            providers.ollama.timeout_secs,
        ),
        (
            "perplexity",
            &providers.perplexity.base_url,
            &providers.perplexity.model,
            providers.perplexity.timeout_secs,
        ),
    ] {
        if url.trim().is_empty() {
            return invalid(format!("providers.{}.base_url must not be empty", name));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return invalid(format!(
                "providers.{}.base_url must be an http(s) URL, got '{}'",
                name, url
            ));
        }
        if model.trim().is_empty() {
            return invalid(format!("providers.{}.model must not be empty", name));
        }
        if timeout == 0 {
            return invalid(format!("providers.{}.timeout_secs must be positive", name));
        }
    }

    let a = &config.analytics;
    for (name, value) in [
        ("top_skills", a.top_skills),
        ("skills_per_status", a.skills_per_status),
        ("focus_locations", a.focus_locations),
        ("list_page_size", a.list_page_size),
        ("skill_pairs", a.skill_pairs),
        ("top_titles", a.top_titles),
    ] {
        if value == 0 {
            return invalid(format!("analytics.{} must be positive", name));
        }
    }

    Ok(())
}
