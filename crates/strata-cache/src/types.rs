//! Cache types.

use serde::{Deserialize, Serialize};

/// Custom object metadata field recording the archive compression
/// method, so extraction is self-describing.
pub const COMPRESSION_METADATA_KEY: &str = "cache-compression-method";

/// Compression applied to a stored archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    Gzip,
    Zstd,
}

impl CompressionMethod {
    /// Preferred method for this host. Deterministic: two runs on the
    /// same host always pick the same method.
    pub fn preferred() -> Self {
        if cfg!(windows) {
            CompressionMethod::Gzip
        } else {
            CompressionMethod::Zstd
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionMethod::Gzip => "gzip",
            CompressionMethod::Zstd => "zstd",
        }
    }

    /// Parse the stored metadata value. Unknown values yield `None` and
    /// are treated as a cache miss by callers.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "gzip" => Some(CompressionMethod::Gzip),
            "zstd" => Some(CompressionMethod::Zstd),
            _ => None,
        }
    }
}

/// How a restore request matched the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Object found at the precise requested key.
    Exact,
    /// Object found via a restore-key prefix.
    Partial,
    #[default]
    None,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Partial => "partial",
            MatchKind::None => "none",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_methods() {
        assert_eq!(CompressionMethod::parse("gzip"), Some(CompressionMethod::Gzip));
        assert_eq!(CompressionMethod::parse("zstd"), Some(CompressionMethod::Zstd));
        assert_eq!(CompressionMethod::parse("lz77"), None);
    }

    #[test]
    fn test_preferred_is_stable() {
        assert_eq!(CompressionMethod::preferred(), CompressionMethod::preferred());
    }
}
