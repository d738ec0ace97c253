//! Database error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating the database directory.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// A record could not be encoded for `raw_json`.
    #[error("Failed to encode job record: {0}")]
    Encode(#[from] serde_json::Error),

    /// A stored `raw_json` payload no longer parses as a job record.
    #[error("Corrupt record payload for job {id}: {source}")]
    CorruptPayload {
        id: i64,
        #[source]
        source: serde_json::Error,
    },

    /// No job row with this id.
    #[error("job {0} not found")]
    NotFound(i64),

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,
}
