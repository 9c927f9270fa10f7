//! S3-compatible bucket store.

use super::{ObjectMeta, ObjectStore, ObjectSummary};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use strata_core::{Error, Result};
use tracing::debug;

// S3 caps a single DeleteObjects request at 1000 keys.
const DELETE_BATCH: usize = 1000;

pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

fn to_chrono(ts: &aws_sdk_s3::primitives::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()).unwrap_or_default()
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false) =>
            {
                Ok(false)
            }
            Err(err) => Err(Error::Storage(format!("head '{key}' failed: {err}"))),
        }
    }

    async fn metadata(&self, key: &str) -> Result<Option<ObjectMeta>> {
        let head = match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(head) => head,
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false) =>
            {
                return Ok(None);
            }
            Err(err) => return Err(Error::Storage(format!("head '{key}' failed: {err}"))),
        };

        Ok(Some(ObjectMeta {
            size: head.content_length().unwrap_or_default() as u64,
            updated_at: head.last_modified().map(to_chrono).unwrap_or_default(),
            custom: head.metadata().cloned().unwrap_or_default(),
        }))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>> {
        let mut out = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| Error::Storage(format!("list '{prefix}' failed: {e}")))?;
            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                out.push(ObjectSummary {
                    key: key.to_string(),
                    updated_at: object.last_modified().map(to_chrono).unwrap_or_default(),
                });
            }
        }
        Ok(out)
    }

    async fn upload(
        &self,
        local: &Path,
        key: &str,
        custom: HashMap<String, String>,
    ) -> Result<()> {
        let body = ByteStream::from_path(local).await.map_err(|e| {
            Error::UploadFailed {
                key: key.to_string(),
                reason: format!("failed to open '{}': {e}", local.display()),
            }
        })?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .set_metadata(Some(custom))
            .body(body)
            .send()
            .await
            .map_err(|e| Error::UploadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn read_range(&self, key: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .range(format!("bytes={start}-{end}"))
            .send()
            .await
            .map_err(|e| Error::Storage(format!("range get '{key}' failed: {e}")))?;
        let data = object
            .body
            .collect()
            .await
            .map_err(|e| Error::Storage(format!("range body '{key}' failed: {e}")))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let summaries = self.list(prefix).await?;
        if summaries.is_empty() {
            debug!(prefix, "nothing to delete");
            return Ok(0);
        }

        let mut deleted = 0u64;
        for chunk in summaries.chunks(DELETE_BATCH) {
            let mut identifiers = Vec::with_capacity(chunk.len());
            for summary in chunk {
                let id = ObjectIdentifier::builder()
                    .key(&summary.key)
                    .build()
                    .map_err(|e| Error::Storage(format!("bad delete key: {e}")))?;
                identifiers.push(id);
            }
            let delete = Delete::builder()
                .set_objects(Some(identifiers))
                .build()
                .map_err(|e| Error::Storage(format!("bad delete request: {e}")))?;
            self.client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| Error::Storage(format!("delete '{prefix}' failed: {e}")))?;
            deleted += chunk.len() as u64;
        }
        Ok(deleted)
    }
}
