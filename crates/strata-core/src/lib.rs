//! Strata Core
//!
//! Shared vocabulary for the Strata build cache: error types and
//! validated configuration. This crate has minimal dependencies and is
//! used by every other crate in the workspace.

pub mod config;
pub mod error;

pub use config::{CacheConfig, TransferConfig};
pub use error::{Error, Result};
