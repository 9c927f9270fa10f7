//! Error types for Strata.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid shard spec '{spec}': {reason}")]
    ShardSpec { spec: String, reason: String },

    // Object store errors
    #[error("Object store error: {0}")]
    Storage(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Download failed for '{key}': {reason}")]
    DownloadFailed { key: String, reason: String },

    #[error("Upload failed for '{key}': {reason}")]
    UploadFailed { key: String, reason: String },

    // Archive errors
    #[error("Archive creation failed: {0}")]
    ArchiveCreate(String),

    #[error("Archive extraction failed: {0}")]
    ArchiveExtract(String),

    #[error("Invalid path pattern: {0}")]
    PathPattern(String),

    // Infrastructure errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
