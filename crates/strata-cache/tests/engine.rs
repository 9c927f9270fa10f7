//! Engine-level restore/save/erase behavior against an in-memory store.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use strata_cache::engine::{CacheEngine, RestoreRequest, RestoreState};
use strata_cache::store::{MemoryStore, ObjectMeta, ObjectStore, ObjectSummary};
use strata_cache::types::MatchKind;
use strata_core::{CacheConfig, Result, TransferConfig};

/// Counts upload attempts that reach the store.
struct CountingStore {
    inner: MemoryStore,
    uploads: AtomicU32,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            uploads: AtomicU32::new(0),
        }
    }

    fn uploads(&self) -> u32 {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for CountingStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn metadata(&self, key: &str) -> Result<Option<ObjectMeta>> {
        self.inner.metadata(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>> {
        self.inner.list(prefix).await
    }

    async fn upload(
        &self,
        local: &Path,
        key: &str,
        custom: HashMap<String, String>,
    ) -> Result<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.inner.upload(local, key, custom).await
    }

    async fn read_range(&self, key: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        self.inner.read_range(key, start, end).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        self.inner.delete_prefix(prefix).await
    }
}

fn config(working_dir: PathBuf) -> CacheConfig {
    CacheConfig {
        bucket: "cache-bucket".to_string(),
        owner: "acme".to_string(),
        repo: "frontends".to_string(),
        branch: "refs/heads/feature-x".to_string(),
        shared_branches: vec![
            "refs/heads/master".to_string(),
            "refs/heads/main".to_string(),
        ],
        pr_context: false,
        working_dir,
        transfer: TransferConfig {
            chunk_size: 16 * 1024,
            concurrency: 4,
            max_retries: 2,
        },
    }
}

fn request(key: &str) -> RestoreRequest {
    RestoreRequest {
        paths: vec!["pkg/node_modules".to_string(), "lockfile".to_string()],
        key: key.to_string(),
        restore_keys: vec!["tsc-".to_string()],
        alternate_repo: None,
        working_subdir: None,
    }
}

fn populate_workspace(root: &Path) {
    std::fs::create_dir_all(root.join("pkg/node_modules")).unwrap();
    std::fs::write(root.join("pkg/node_modules/index.js"), b"module.exports = 1;").unwrap();
    std::fs::write(root.join("lockfile"), b"lockfile-v1").unwrap();
}

#[tokio::test]
async fn test_save_is_idempotent() {
    let workspace = tempfile::tempdir().unwrap();
    populate_workspace(workspace.path());
    let engine = CacheEngine::new(
        CountingStore::new(),
        config(workspace.path().to_path_buf()),
    )
    .unwrap();

    let state = engine.restore(request("tsc-v5-abc")).await.unwrap();
    assert_eq!(state.hit, MatchKind::None);

    engine.save(&state).await.unwrap();
    engine.save(&state).await.unwrap();

    assert_eq!(engine.store().uploads(), 1);
    assert_eq!(engine.store().inner.len(), 1);
}

#[tokio::test]
async fn test_save_skipped_after_exact_hit() {
    let workspace = tempfile::tempdir().unwrap();
    populate_workspace(workspace.path());
    let engine = CacheEngine::new(
        CountingStore::new(),
        config(workspace.path().to_path_buf()),
    )
    .unwrap();

    let state = RestoreState {
        paths: vec!["lockfile".to_string()],
        hit: MatchKind::Exact,
        target_key: "acme/frontends/refs/heads/feature-x/tsc-v5.tar".to_string(),
    };
    engine.save(&state).await.unwrap();

    assert_eq!(engine.store().uploads(), 0);
    assert!(engine.store().inner.is_empty());
}

#[tokio::test]
async fn test_save_then_restore_roundtrip() {
    let workspace = tempfile::tempdir().unwrap();
    populate_workspace(workspace.path());
    let engine =
        CacheEngine::new(MemoryStore::new(), config(workspace.path().to_path_buf())).unwrap();

    let state = engine.restore(request("tsc-v5-abc")).await.unwrap();
    engine.save(&state).await.unwrap();

    // Restore the saved archive into a clean subdirectory.
    let mut req = request("tsc-v5-abc");
    req.working_subdir = Some("restored".to_string());
    let state = engine.restore(req).await.unwrap();

    assert_eq!(state.hit, MatchKind::Exact);
    assert_eq!(
        std::fs::read(workspace.path().join("restored/pkg/node_modules/index.js")).unwrap(),
        b"module.exports = 1;"
    );
    assert_eq!(
        std::fs::read(workspace.path().join("restored/lockfile")).unwrap(),
        b"lockfile-v1"
    );
}

#[tokio::test]
async fn test_matched_object_without_metadata_is_a_miss() {
    let workspace = tempfile::tempdir().unwrap();
    populate_workspace(workspace.path());
    let store = MemoryStore::new();
    // Foreign object at the exact key, but without the compression
    // metadata field.
    store.put_object(
        "acme/frontends/refs/heads/feature-x/tsc-v5-abc.tar",
        vec![1, 2, 3],
        Utc::now(),
        HashMap::new(),
    );
    let engine = CacheEngine::new(store, config(workspace.path().to_path_buf())).unwrap();

    let state = engine.restore(request("tsc-v5-abc")).await.unwrap();
    assert_eq!(state.hit, MatchKind::None);
}

#[tokio::test]
async fn test_save_with_no_matching_paths_fails() {
    let workspace = tempfile::tempdir().unwrap();
    let engine =
        CacheEngine::new(MemoryStore::new(), config(workspace.path().to_path_buf())).unwrap();

    let state = RestoreState {
        paths: vec!["does-not-exist/**".to_string()],
        hit: MatchKind::None,
        target_key: "acme/frontends/refs/heads/feature-x/k.tar".to_string(),
    };
    assert!(engine.save(&state).await.is_err());
    assert!(engine.store().is_empty());
}

#[tokio::test]
async fn test_alternate_repo_lookup_saves_to_own_scope() {
    let workspace = tempfile::tempdir().unwrap();
    populate_workspace(workspace.path());
    let engine =
        CacheEngine::new(MemoryStore::new(), config(workspace.path().to_path_buf())).unwrap();

    let mut req = request("tsc-v5-abc");
    req.alternate_repo = Some("frontends-fork".to_string());
    let state = engine.restore(req).await.unwrap();

    assert_eq!(state.hit, MatchKind::None);
    assert_eq!(
        state.target_key,
        "acme/frontends/refs/heads/feature-x/tsc-v5-abc.tar"
    );
}

#[tokio::test]
async fn test_erase_removes_only_branch_objects() {
    let workspace = tempfile::tempdir().unwrap();
    populate_workspace(workspace.path());
    let engine =
        CacheEngine::new(MemoryStore::new(), config(workspace.path().to_path_buf())).unwrap();

    let state = engine.restore(request("tsc-v5-abc")).await.unwrap();
    engine.save(&state).await.unwrap();
    engine.store().put_object(
        "acme/frontends/refs/heads/main/tsc-v5-abc.tar",
        vec![0u8; 8],
        Utc::now(),
        HashMap::new(),
    );

    let deleted = engine.erase("refs/heads/feature-x").await.unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(engine.store().len(), 1);

    // Erasing an already-empty branch is success.
    assert_eq!(engine.erase("refs/heads/feature-x").await.unwrap(), 0);
}
