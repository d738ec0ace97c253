use std::path::PathBuf;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::{ExtractionError, SchemaError, StorageError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Posting text is empty")]
    EmptyPosting,

    #[error("Artifact storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Failed to save job: {0}")]
    Database(#[from] DatabaseError),
}

/// A failed run together with whatever artifacts it had already written.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct PipelineFailure {
    #[source]
    pub error: PipelineError,
    pub raw_path: Option<PathBuf>,
    pub structured_path: Option<PathBuf>,
}

impl PipelineFailure {
    pub(crate) fn new(error: impl Into<PipelineError>, raw_path: Option<PathBuf>) -> Self {
        Self {
            error: error.into(),
            raw_path,
            structured_path: None,
        }
    }
}
