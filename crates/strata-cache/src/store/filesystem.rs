//! Filesystem-backed store for local development.
//!
//! Objects live at `root/{key}`; custom metadata sits in a JSON sidecar
//! next to each object. Timestamps come from file mtimes.

use super::{ObjectMeta, ObjectStore, ObjectSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use strata_core::{Error, Result};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

const SIDECAR_SUFFIX: &str = ".meta.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    custom: HashMap<String, String>,
}

pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn sidecar_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}{SIDECAR_SUFFIX}"))
    }

    /// Walk the tree, yielding (key, path) for every object file.
    async fn walk(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut out = Vec::new();
        if !tokio::fs::try_exists(&self.root).await? {
            return Ok(out);
        }
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                let key = path
                    .strip_prefix(&self.root)
                    .map_err(|e| Error::Internal(format!("path outside store root: {e}")))?
                    .to_string_lossy()
                    .replace('\\', "/");
                if key.ends_with(SIDECAR_SUFFIX) {
                    continue;
                }
                out.push((key, path));
            }
        }
        Ok(out)
    }

    async fn read_sidecar(&self, key: &str) -> Result<HashMap<String, String>> {
        match tokio::fs::read(self.sidecar_path(key)).await {
            Ok(raw) => {
                let sidecar: Sidecar = serde_json::from_slice(&raw)?;
                Ok(sidecar.custom)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

fn mtime(meta: &std::fs::Metadata) -> DateTime<Utc> {
    meta.modified().map(DateTime::<Utc>::from).unwrap_or_default()
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.object_path(key)).await?)
    }

    async fn metadata(&self, key: &str) -> Result<Option<ObjectMeta>> {
        match tokio::fs::metadata(self.object_path(key)).await {
            Ok(meta) => Ok(Some(ObjectMeta {
                size: meta.len(),
                updated_at: mtime(&meta),
                custom: self.read_sidecar(key).await?,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>> {
        let mut out = Vec::new();
        for (key, path) in self.walk().await? {
            if !key.starts_with(prefix) {
                continue;
            }
            let meta = tokio::fs::metadata(&path).await?;
            out.push(ObjectSummary {
                key,
                updated_at: mtime(&meta),
            });
        }
        Ok(out)
    }

    async fn upload(
        &self,
        local: &Path,
        key: &str,
        custom: HashMap<String, String>,
    ) -> Result<()> {
        let path = self.object_path(key);
        if tokio::fs::try_exists(&path).await? {
            debug!(key, "object already present; keeping first writer");
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local, &path).await?;
        let sidecar = serde_json::to_vec(&Sidecar { custom })?;
        tokio::fs::write(self.sidecar_path(key), sidecar).await?;
        Ok(())
    }

    async fn read_range(&self, key: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        let mut file = tokio::fs::File::open(self.object_path(key))
            .await
            .map_err(|e| Error::Storage(format!("open '{key}' failed: {e}")))?;
        file.seek(SeekFrom::Start(start)).await?;
        let len = (end - start + 1) as usize;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)
            .await
            .map_err(|e| Error::Storage(format!("range read '{key}' failed: {e}")))?;
        Ok(buf)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut deleted = 0u64;
        for (key, path) in self.walk().await? {
            if !key.starts_with(prefix) {
                continue;
            }
            tokio::fs::remove_file(&path).await?;
            let sidecar = self.sidecar_path(&key);
            if tokio::fs::try_exists(&sidecar).await? {
                tokio::fs::remove_file(&sidecar).await?;
            }
            deleted += 1;
        }
        Ok(deleted)
    }
}
