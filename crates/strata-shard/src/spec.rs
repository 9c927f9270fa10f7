//! Shard spec parsing.
//!
//! The CI configuration names a shard as `"<current>/<total>"`,
//! 1-based. Malformed input is a fatal configuration error caught
//! before any work starts.

use std::str::FromStr;
use strata_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardSpec {
    /// 1-based shard index.
    pub current: usize,
    pub total: usize,
}

impl ShardSpec {
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::ShardSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = spec.splitn(2, '/');
        let (Some(current), Some(total)) = (parts.next(), parts.next()) else {
            return Err(invalid("expected \"<current>/<total>\""));
        };
        let current: usize = current
            .trim()
            .parse()
            .map_err(|_| invalid("current shard is not a positive integer"))?;
        let total: usize = total
            .trim()
            .parse()
            .map_err(|_| invalid("total shards is not a positive integer"))?;

        if total == 0 {
            return Err(invalid("total shards must be positive"));
        }
        if current < 1 || current > total {
            return Err(invalid("current shard must satisfy 1 <= current <= total"));
        }
        Ok(Self { current, total })
    }

    /// 0-based index into the distributed shard list.
    pub fn index(&self) -> usize {
        self.current - 1
    }
}

impl FromStr for ShardSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_specs() {
        assert_eq!(ShardSpec::parse("1/3").unwrap(), ShardSpec { current: 1, total: 3 });
        assert_eq!(ShardSpec::parse("3/3").unwrap(), ShardSpec { current: 3, total: 3 });
        assert_eq!(ShardSpec::parse("1/1").unwrap(), ShardSpec { current: 1, total: 1 });
    }

    #[test]
    fn test_invalid_specs_rejected() {
        for spec in ["0/3", "4/3", "x/y", "3", "", "1/0", "-1/3", "1/3/5x"] {
            assert!(ShardSpec::parse(spec).is_err(), "accepted {spec:?}");
        }
    }
}
