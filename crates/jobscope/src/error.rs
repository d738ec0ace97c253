use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobscopeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Malformed data on the length-prefixed channel.
///
/// A clean end of stream is not an error; see [`crate::codec::read_frame`].
#[derive(Error, Debug)]
pub enum FramingError {
    #[error("Truncated frame header: got {read} of 4 length bytes")]
    TruncatedHeader { read: usize },

    #[error("Truncated frame body: expected {expected} bytes, got {read}")]
    TruncatedBody { expected: usize, read: usize },

    #[error("Frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("Channel I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A provider call that produced no usable reply text.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("extraction failed via {provider}: no API key configured")]
    MissingApiKey { provider: String },

    #[error("extraction failed via {provider}: request failed: {detail}")]
    Transport { provider: String, detail: String },

    #[error("extraction failed via {provider}: returned status {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("extraction failed via {provider}: response contained no choices")]
    EmptyResponse { provider: String },

    #[error("extraction failed via {provider}: unreadable response envelope: {detail}")]
    InvalidEnvelope { provider: String, detail: String },
}

impl ExtractionError {
    /// Name of the provider that failed.
    pub fn provider(&self) -> &str {
        match self {
            Self::MissingApiKey { provider }
            | Self::Transport { provider, .. }
            | Self::Status { provider, .. }
            | Self::EmptyResponse { provider }
            | Self::InvalidEnvelope { provider, .. } => provider,
        }
    }
}

/// The model reply could not be reconciled into the canonical record.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("model reply does not match the job schema: {reason}")]
    Mismatch { reason: String, raw: String },
}

impl SchemaError {
    /// The reply text exactly as the provider returned it.
    pub fn raw(&self) -> &str {
        match self {
            Self::Mismatch { raw, .. } => raw,
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize artifact: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

pub type Result<T> = std::result::Result<T, JobscopeError>;
