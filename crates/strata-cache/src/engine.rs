//! Restore/save orchestration.
//!
//! The engine wires the resolver, the object store, and the archive
//! codec into the two operations CI jobs call. A restore returns a
//! [`RestoreState`] handle that the paired save consumes, so hit
//! tracking is scoped to one restore/save pair instead of living in
//! process-wide state.

use crate::archive;
use crate::keys;
use crate::resolver::{self, ResolveRequest};
use crate::store::ObjectStore;
use crate::transfer::{self, DownloadOptions};
use crate::types::{COMPRESSION_METADATA_KEY, CompressionMethod, MatchKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use strata_core::{CacheConfig, Error, Result};
use tracing::{debug, info, warn};

/// One restore request.
#[derive(Debug, Clone)]
pub struct RestoreRequest {
    /// Glob-style paths, relative to the working directory, that the
    /// paired save will archive.
    pub paths: Vec<String>,
    /// Primary cache key (content/version fingerprint).
    pub key: String,
    /// Fallback key prefixes in preference order.
    pub restore_keys: Vec<String>,
    /// Restore from another repository's cache (cross-fork reuse).
    /// Save still targets this job's own scope.
    pub alternate_repo: Option<String>,
    /// Subdirectory of the working directory to extract into.
    pub working_subdir: Option<String>,
}

/// State threaded from a restore into the paired save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreState {
    pub paths: Vec<String>,
    pub hit: MatchKind,
    /// Exact key the paired save will write.
    pub target_key: String,
}

pub struct CacheEngine<S> {
    store: S,
    config: CacheConfig,
}

impl<S: ObjectStore> CacheEngine<S> {
    pub fn new(store: S, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Restore the best matching archive into the working directory,
    /// returning the state handle the paired [`save`](Self::save) needs.
    /// A miss (including missing compression metadata on a matched
    /// object) is not an error.
    pub async fn restore(&self, req: RestoreRequest) -> Result<RestoreState> {
        let own_scope = self.config.scope();
        let lookup_scope = match &req.alternate_repo {
            Some(repo) => format!("{}/{}", self.config.owner, repo),
            None => own_scope.clone(),
        };
        let target_key = keys::object_key(&own_scope, &self.config.branch, &req.key);

        let lookup_started = Instant::now();
        let resolution = resolver::resolve(
            &self.store,
            &ResolveRequest {
                scope: &lookup_scope,
                primary_key: &req.key,
                restore_keys: &req.restore_keys,
                branch: &self.config.branch,
                shared_branches: &self.config.shared_branches,
                pr_context: self.config.pr_context,
                include_branch: req.alternate_repo.is_none(),
            },
        )
        .await?;
        info!(
            kind = resolution.kind.as_str(),
            elapsed_ms = lookup_started.elapsed().as_millis() as u64,
            "cache lookup finished"
        );

        let miss = RestoreState {
            paths: req.paths.clone(),
            hit: MatchKind::None,
            target_key: target_key.clone(),
        };

        let Some(matched) = resolution.key else {
            info!("no cache candidate found");
            return Ok(miss);
        };

        let Some(meta) = self.store.metadata(&matched).await? else {
            warn!(key = matched.as_str(), "matched object vanished; treating as miss");
            return Ok(miss);
        };
        let method = meta
            .custom
            .get(COMPRESSION_METADATA_KEY)
            .and_then(|value| CompressionMethod::parse(value));
        let Some(method) = method else {
            warn!(
                key = matched.as_str(),
                "missing or unknown compression metadata; treating as miss"
            );
            return Ok(miss);
        };

        let workspace = match &req.working_subdir {
            Some(subdir) => self.config.working_dir.join(subdir),
            None => self.config.working_dir.clone(),
        };

        let tmp = tempfile::Builder::new()
            .prefix("strata-cache-")
            .suffix(".tar")
            .tempfile()?
            .into_temp_path();

        let download_started = Instant::now();
        let opts = DownloadOptions {
            chunk_size: self.config.transfer.chunk_size,
            concurrency: self.config.transfer.concurrency,
            max_retries: self.config.transfer.max_retries,
        };
        let bytes = transfer::parallel_download(&self.store, &matched, &tmp, opts).await?;
        info!(
            key = matched.as_str(),
            bytes,
            elapsed_ms = download_started.elapsed().as_millis() as u64,
            "downloaded cache archive"
        );

        tokio::fs::create_dir_all(&workspace).await?;
        let archive_path = tmp.to_path_buf();
        let dest = workspace.clone();
        let extract_started = Instant::now();
        tokio::task::spawn_blocking(move || archive::extract_archive(&archive_path, method, &dest))
            .await
            .map_err(|e| Error::Internal(format!("extract task panicked: {e}")))??;
        info!(
            elapsed_ms = extract_started.elapsed().as_millis() as u64,
            "extracted cache archive"
        );

        Ok(RestoreState {
            paths: req.paths,
            hit: resolution.kind,
            target_key,
        })
    }

    /// Archive the state's paths and upload them under the target key.
    /// No-ops when the paired restore was an exact hit or when another
    /// job already uploaded the object (first writer wins). Calling
    /// save twice with the same key stores exactly one object.
    pub async fn save(&self, state: &RestoreState) -> Result<()> {
        if state.hit == MatchKind::Exact {
            info!(
                key = state.target_key.as_str(),
                "exact hit on restore; skipping upload"
            );
            return Ok(());
        }
        if self.store.exists(&state.target_key).await? {
            info!(
                key = state.target_key.as_str(),
                "cache object already exists (another job won the race); skipping upload"
            );
            return Ok(());
        }

        let base = self.config.working_dir.clone();
        let paths = expand_paths(&state.paths, &base)?;
        if paths.is_empty() {
            return Err(Error::ArchiveCreate(format!(
                "no files matched save paths {:?}",
                state.paths
            )));
        }
        debug!(count = paths.len(), "archiving save paths");

        let tmp = tempfile::Builder::new()
            .prefix("strata-cache-")
            .suffix(".tar")
            .tempfile()?
            .into_temp_path();

        let archive_path = tmp.to_path_buf();
        let archive_started = Instant::now();
        let method = tokio::task::spawn_blocking(move || {
            archive::create_archive(&archive_path, &paths, &base)
        })
        .await
        .map_err(|e| Error::Internal(format!("archive task panicked: {e}")))??;
        info!(
            method = method.as_str(),
            elapsed_ms = archive_started.elapsed().as_millis() as u64,
            "created cache archive"
        );

        let mut custom = HashMap::new();
        custom.insert(
            COMPRESSION_METADATA_KEY.to_string(),
            method.as_str().to_string(),
        );

        let upload_started = Instant::now();
        self.store
            .upload(tmp.as_ref(), &state.target_key, custom)
            .await?;
        info!(
            key = state.target_key.as_str(),
            elapsed_ms = upload_started.elapsed().as_millis() as u64,
            "uploaded cache archive"
        );
        Ok(())
    }

    /// Delete every cache object under the scope's `branch`.
    pub async fn erase(&self, branch: &str) -> Result<u64> {
        let prefix = keys::branch_prefix(&self.config.scope(), branch);
        info!(prefix = prefix.as_str(), "erasing cache objects");
        let deleted = self.store.delete_prefix(&prefix).await?;
        info!(deleted, "finished erasing cache objects");
        Ok(deleted)
    }
}

/// Expand glob-style patterns relative to `base` into sorted, deduped
/// relative paths.
fn expand_paths(patterns: &[String], base: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for pattern in patterns {
        let absolute = base.join(pattern);
        let matches = glob::glob(&absolute.to_string_lossy())
            .map_err(|e| Error::PathPattern(format!("'{pattern}': {e}")))?;
        for entry in matches {
            let path = entry.map_err(|e| Error::PathPattern(format!("'{pattern}': {e}")))?;
            let rel = path
                .strip_prefix(base)
                .map(Path::to_path_buf)
                .unwrap_or(path);
            out.push(rel);
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_paths_globs_relative_to_base() {
        let scratch = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(scratch.path().join("a/node_modules")).unwrap();
        std::fs::create_dir_all(scratch.path().join("b/node_modules")).unwrap();
        std::fs::write(scratch.path().join("lockfile"), b"x").unwrap();

        let patterns = vec!["*/node_modules".to_string(), "lockfile".to_string()];
        let paths = expand_paths(&patterns, scratch.path()).unwrap();

        assert_eq!(
            paths,
            vec![
                PathBuf::from("a/node_modules"),
                PathBuf::from("b/node_modules"),
                PathBuf::from("lockfile"),
            ]
        );
    }

    #[test]
    fn test_expand_paths_ignores_non_matching() {
        let scratch = tempfile::tempdir().unwrap();
        let patterns = vec!["missing/*".to_string()];
        assert!(expand_paths(&patterns, scratch.path()).unwrap().is_empty());
    }
}
