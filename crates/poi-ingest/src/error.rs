//! Error types for POI ingestion
//!
//! Every variant here is handled inside the worker and logged; callers only
//! ever see them through [`crate::worker::RunOutcome`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Corrupt or truncated peer file content
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("truncated length prefix at byte {offset}")]
    TruncatedPrefix { offset: u64 },

    #[error("malformed length prefix at byte {offset}")]
    MalformedPrefix { offset: u64 },

    #[error("record at byte {offset} declares {declared} bytes but only {available} remain")]
    TruncatedPayload {
        offset: u64,
        declared: u64,
        available: u64,
    },

    #[error("record at byte {offset} declares {declared} bytes, limit is {limit}")]
    FrameTooLarge {
        offset: u64,
        declared: u64,
        limit: usize,
    },

    #[error("invalid record payload at byte {offset}: {source}")]
    Payload {
        offset: u64,
        #[source]
        source: prost::DecodeError,
    },

    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Offset of the frame that failed, when the failure is tied to one
    pub fn offset(&self) -> Option<u64> {
        match self {
            DecodeError::TruncatedPrefix { offset }
            | DecodeError::MalformedPrefix { offset }
            | DecodeError::TruncatedPayload { offset, .. }
            | DecodeError::FrameTooLarge { offset, .. }
            | DecodeError::Payload { offset, .. } => Some(*offset),
            DecodeError::Io(_) => None,
        }
    }
}

/// Failure at the persistence boundary
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("record with hash {hash} is already stored")]
    Duplicate { hash: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Error taxonomy of an ingestion run
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("unable to open {}: {source}", path.display())]
    OpenFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),
}

impl IngestError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        IngestError::Configuration(msg.into())
    }
}
