//! Parallel chunked download.
//!
//! Objects are fetched as fixed-size byte ranges with bounded
//! concurrency. Each range is written at its own offset into a
//! pre-sized destination file, so completion order does not affect the
//! final content. A failed range retries individually with exponential
//! backoff; siblings keep flying and the operation fails at the join
//! point once any range exhausts its budget.

use crate::store::ObjectStore;
use futures::StreamExt;
use futures::stream;
use std::io::SeekFrom;
use std::path::Path;
use std::time::Duration;
use strata_core::{Error, Result};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// Tuning knobs for [`parallel_download`].
#[derive(Debug, Clone, Copy)]
pub struct DownloadOptions {
    pub chunk_size: u64,
    pub concurrency: usize,
    pub max_retries: u32,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024 * 1024,
            concurrency: 12,
            max_retries: 3,
        }
    }
}

/// Download `key` into `dest`, returning the object size in bytes.
pub async fn parallel_download(
    store: &dyn ObjectStore,
    key: &str,
    dest: &Path,
    opts: DownloadOptions,
) -> Result<u64> {
    if opts.chunk_size == 0 || opts.concurrency == 0 {
        return Err(Error::Config(
            "download chunk size and concurrency must be positive".to_string(),
        ));
    }

    let meta = store
        .metadata(key)
        .await?
        .ok_or_else(|| Error::ObjectNotFound(key.to_string()))?;
    let total = meta.size;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    // Pre-size the file so ranged writes can land in any order.
    let file = tokio::fs::File::create(dest).await?;
    file.set_len(total).await?;
    drop(file);

    if total == 0 {
        return Ok(0);
    }

    let mut ranges = Vec::new();
    let mut start = 0u64;
    while start < total {
        let end = (start + opts.chunk_size).min(total) - 1;
        ranges.push((start, end));
        start = end + 1;
    }
    debug!(key, total, ranges = ranges.len(), "starting parallel download");

    let mut results = stream::iter(ranges)
        .map(|(start, end)| fetch_range(store, key, dest, start, end, opts.max_retries))
        .buffer_unordered(opts.concurrency);
    while let Some(result) = results.next().await {
        result?;
    }

    Ok(total)
}

/// Fetch one range, retrying with exponential backoff on failure.
async fn fetch_range(
    store: &dyn ObjectStore,
    key: &str,
    dest: &Path,
    start: u64,
    end: u64,
    max_retries: u32,
) -> Result<()> {
    let mut attempt = 0u32;
    loop {
        match copy_range(store, key, dest, start, end).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                attempt += 1;
                if attempt > max_retries {
                    return Err(Error::DownloadFailed {
                        key: key.to_string(),
                        reason: format!(
                            "range {start}-{end} failed after {max_retries} retries: {err}"
                        ),
                    });
                }
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                warn!(
                    key,
                    start,
                    end,
                    attempt,
                    error = %err,
                    "range download failed; retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn copy_range(
    store: &dyn ObjectStore,
    key: &str,
    dest: &Path,
    start: u64,
    end: u64,
) -> Result<()> {
    let bytes = store.read_range(key, start, end).await?;
    let expected = (end - start + 1) as usize;
    if bytes.len() != expected {
        return Err(Error::Storage(format!(
            "short range read for '{key}': got {} of {expected} bytes",
            bytes.len()
        )));
    }
    // Each range owns a disjoint slice of the destination file.
    let mut file = tokio::fs::OpenOptions::new().write(true).open(dest).await?;
    file.seek(SeekFrom::Start(start)).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;
    Ok(())
}
