//! Cache configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tuning for parallel chunked downloads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferConfig {
    /// Size of each download range in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    /// Maximum simultaneous range requests.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Retry budget per range.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_chunk_size() -> u64 {
    64 * 1024 * 1024
}

fn default_concurrency() -> usize {
    12
}

fn default_max_retries() -> u32 {
    3
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
        }
    }
}

/// Configuration for one cache scope. Unknown fields are rejected at
/// load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Bucket holding the cache objects.
    pub bucket: String,
    /// Repository owner (first key segment).
    pub owner: String,
    /// Repository name (second key segment).
    pub repo: String,
    /// Fully-qualified ref under test (e.g. `refs/heads/feature-x`).
    pub branch: String,
    /// Shared lineage branches eligible as fallback for pull-request
    /// jobs, in priority order.
    #[serde(default = "default_shared_branches")]
    pub shared_branches: Vec<String>,
    /// Whether the job runs in a pull-request-like context.
    #[serde(default)]
    pub pr_context: bool,
    /// Base directory paths are archived and extracted relative to.
    pub working_dir: PathBuf,
    #[serde(default)]
    pub transfer: TransferConfig,
}

fn default_shared_branches() -> Vec<String> {
    vec![
        "refs/heads/master".to_string(),
        "refs/heads/main".to_string(),
    ]
}

impl CacheConfig {
    /// The `{owner}/{repo}` prefix namespacing this scope's objects.
    pub fn scope(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("bucket", &self.bucket),
            ("owner", &self.owner),
            ("repo", &self.repo),
            ("branch", &self.branch),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("'{field}' must not be empty")));
            }
        }
        if self.shared_branches.iter().any(|b| b.trim().is_empty()) {
            return Err(Error::Config(
                "'shared_branches' entries must not be empty".to_string(),
            ));
        }
        if self.transfer.chunk_size == 0 {
            return Err(Error::Config(
                "'transfer.chunk_size' must be positive".to_string(),
            ));
        }
        if self.transfer.concurrency == 0 {
            return Err(Error::Config(
                "'transfer.concurrency' must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
