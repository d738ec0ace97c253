use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use jobscope::config::{LogFormat, LoggingConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Overrides the configured level, e.g. `JOBSCOPE_LOG=jobscope=debug`.
pub const LOG_ENV: &str = "JOBSCOPE_LOG";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to open log file '{path}': {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install subscriber: {0}")]
    Install(String),
}

/// Installs the global subscriber.
///
/// stdout carries frames, so logs go to the configured file (appended) or
/// to stderr. `log` records from the library are bridged into tracing.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let layer = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| LoggingError::OpenFile {
                    path: path.clone(),
                    source: e,
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| LoggingError::OpenFile {
                    path: path.clone(),
                    source: e,
                })?;
            let writer = Mutex::new(file);
            match config.format {
                LogFormat::Json => tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .boxed(),
                LogFormat::Text => tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            }
        }
        None => match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed(),
            LogFormat::Text => tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .boxed(),
        },
    };

    let subscriber = tracing_subscriber::registry().with(layer).with(filter);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| LoggingError::Install(e.to_string()))?;
    tracing_log::LogTracer::init().map_err(|e| LoggingError::Install(e.to_string()))?;
    Ok(())
}
