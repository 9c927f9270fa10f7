//! Object store capability surface and implementations.

mod filesystem;
mod memory;
mod s3;

pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;
pub use s3::S3Store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use strata_core::Result;

/// Metadata for a stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub size: u64,
    pub updated_at: DateTime<Utc>,
    /// Custom metadata recorded at upload time.
    pub custom: HashMap<String, String>,
}

/// Listing entry for a prefix query.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub updated_at: DateTime<Utc>,
}

/// Capability surface over a bucket. Every operation is safe to retry.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether an object exists at `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Object metadata, or `None` when the object is missing.
    async fn metadata(&self, key: &str) -> Result<Option<ObjectMeta>>;

    /// All objects whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>>;

    /// Single-PUT upload. Callers check existence first; an object that
    /// appears concurrently under the same key is treated as success
    /// (first writer wins).
    async fn upload(
        &self,
        local: &Path,
        key: &str,
        custom: HashMap<String, String>,
    ) -> Result<()>;

    /// Read the inclusive byte range `[start, end]` of an object.
    async fn read_range(&self, key: &str, start: u64, end: u64) -> Result<Vec<u8>>;

    /// Delete every object under `prefix`, returning the count. An
    /// empty prefix match is success, not an error.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;
}
