//! Remote build cache for CI fleets (S3-compatible object storage).
//!
//! Content-addressed archive cache with exact/partial key matching,
//! branch-aware fallback, parallel chunked download, and idempotent
//! save semantics.

pub mod archive;
pub mod engine;
pub mod keys;
pub mod resolver;
pub mod store;
pub mod transfer;
pub mod types;

pub use engine::{CacheEngine, RestoreRequest, RestoreState};
pub use resolver::{Resolution, ResolveRequest, resolve};
pub use store::{FilesystemStore, MemoryStore, ObjectMeta, ObjectStore, ObjectSummary, S3Store};
pub use transfer::{DownloadOptions, parallel_download};
pub use types::{COMPRESSION_METADATA_KEY, CompressionMethod, MatchKind};
