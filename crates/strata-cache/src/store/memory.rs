//! In-memory store for tests and ephemeral single-process runs.

use super::{ObjectMeta, ObjectStore, ObjectSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;
use strata_core::{Error, Result};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    updated_at: DateTime<Utc>,
    custom: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, controlling its timestamp.
    pub fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        updated_at: DateTime<Utc>,
        custom: HashMap<String, String>,
    ) {
        self.objects.lock().expect("store lock poisoned").insert(
            key.to_string(),
            StoredObject {
                data,
                updated_at,
                custom,
            },
        );
    }

    /// Raw bytes of a stored object, if present.
    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .expect("store lock poisoned")
            .get(key)
            .map(|o| o.data.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self
            .objects
            .lock()
            .expect("store lock poisoned")
            .contains_key(key))
    }

    async fn metadata(&self, key: &str) -> Result<Option<ObjectMeta>> {
        Ok(self
            .objects
            .lock()
            .expect("store lock poisoned")
            .get(key)
            .map(|o| ObjectMeta {
                size: o.data.len() as u64,
                updated_at: o.updated_at,
                custom: o.custom.clone(),
            }))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>> {
        Ok(self
            .objects
            .lock()
            .expect("store lock poisoned")
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, o)| ObjectSummary {
                key: key.clone(),
                updated_at: o.updated_at,
            })
            .collect())
    }

    async fn upload(
        &self,
        local: &Path,
        key: &str,
        custom: HashMap<String, String>,
    ) -> Result<()> {
        let data = tokio::fs::read(local).await?;
        let mut objects = self.objects.lock().expect("store lock poisoned");
        // First writer wins; a concurrent identical upload is a no-op.
        objects.entry(key.to_string()).or_insert(StoredObject {
            data,
            updated_at: Utc::now(),
            custom,
        });
        Ok(())
    }

    async fn read_range(&self, key: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        let objects = self.objects.lock().expect("store lock poisoned");
        let object = objects
            .get(key)
            .ok_or_else(|| Error::ObjectNotFound(key.to_string()))?;
        let len = object.data.len() as u64;
        if start >= len || end >= len || start > end {
            return Err(Error::Storage(format!(
                "range {start}-{end} out of bounds for '{key}' ({len} bytes)"
            )));
        }
        Ok(object.data[start as usize..=end as usize].to_vec())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut objects = self.objects.lock().expect("store lock poisoned");
        let before = objects.len();
        objects.retain(|key, _| !key.starts_with(prefix));
        Ok((before - objects.len()) as u64)
    }
}
