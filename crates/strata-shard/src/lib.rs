//! Version-grouped work sharding.
//!
//! Splits a labeled work-item set across N CI shards so that items
//! sharing a version tag run contiguously within a shard (keeping a
//! warm local cache between consecutive items) while shard sizes stay
//! balanced.

pub mod distribute;
pub mod spec;

pub use distribute::{shard, shard_partitions};
pub use spec::ShardSpec;
