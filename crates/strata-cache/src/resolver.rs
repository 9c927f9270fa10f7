//! Cache key resolution.
//!
//! Exact lookups run first, across the job's branch and (for
//! pull-request jobs) each shared lineage branch in declared priority.
//! Failing that, restore-key prefixes select the most recently updated
//! candidate object.

use crate::keys;
use crate::store::{ObjectStore, ObjectSummary};
use crate::types::MatchKind;
use futures::future;
use strata_core::Result;
use tracing::{debug, info};

/// Inputs for one resolution.
#[derive(Debug, Clone)]
pub struct ResolveRequest<'a> {
    /// `{owner}/{repo}` prefix to search under.
    pub scope: &'a str,
    pub primary_key: &'a str,
    /// Key prefixes in preference order, most specific first.
    pub restore_keys: &'a [String],
    pub branch: &'a str,
    /// Fallback branches in priority order; consulted only for
    /// pull-request-like jobs.
    pub shared_branches: &'a [String],
    pub pr_context: bool,
    /// Cross-scope restores skip the branch-local namespace.
    pub include_branch: bool,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub kind: MatchKind,
    pub key: Option<String>,
}

impl Resolution {
    fn none() -> Self {
        Self {
            kind: MatchKind::None,
            key: None,
        }
    }
}

/// Find the best stored archive for the request.
pub async fn resolve(store: &dyn ObjectStore, req: &ResolveRequest<'_>) -> Result<Resolution> {
    // Branch priority: the job's own branch first, then shared lineage
    // branches in declared order.
    let mut branches: Vec<&str> = Vec::new();
    if req.include_branch {
        branches.push(req.branch);
    }
    if req.pr_context {
        for shared in req.shared_branches {
            if !branches.contains(&shared.as_str()) {
                branches.push(shared);
            }
        }
    }
    if branches.is_empty() {
        return Ok(Resolution::none());
    }

    let candidates: Vec<String> = branches
        .iter()
        .map(|branch| keys::object_key(req.scope, branch, req.primary_key))
        .collect();
    // Existence checks run concurrently; priority is applied after all
    // results are in, so completion order never changes the winner.
    let checks = future::try_join_all(candidates.iter().map(|key| store.exists(key))).await?;
    if let Some(key) = candidates
        .iter()
        .zip(&checks)
        .find(|(_, found)| **found)
        .map(|(key, _)| key.clone())
    {
        info!(key = key.as_str(), "exact cache match");
        return Ok(Resolution {
            kind: MatchKind::Exact,
            key: Some(key),
        });
    }
    debug!(key = req.primary_key, "no exact cache match");

    if req.restore_keys.is_empty() {
        return Ok(Resolution::none());
    }

    // Seed the candidate listing with every restore key under every
    // eligible branch namespace.
    let mut prefixes = Vec::new();
    for branch in &branches {
        for restore_key in req.restore_keys {
            prefixes.push(keys::restore_prefix(req.scope, branch, restore_key));
        }
    }
    let listings = future::try_join_all(prefixes.iter().map(|prefix| store.list(prefix))).await?;

    let mut candidates: Vec<ObjectSummary> = listings.into_iter().flatten().collect();
    // Most recent first; ties within a prefix group resolve by recency.
    candidates.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.key.cmp(&b.key)));
    candidates.dedup_by(|a, b| a.key == b.key);

    for restore_key in req.restore_keys {
        let matched = candidates.iter().find(|candidate| {
            branches.iter().any(|branch| {
                candidate
                    .key
                    .starts_with(&keys::restore_prefix(req.scope, branch, restore_key))
            })
        });
        if let Some(candidate) = matched {
            info!(
                restore_key = restore_key.as_str(),
                key = candidate.key.as_str(),
                "partial cache match"
            );
            return Ok(Resolution {
                kind: MatchKind::Partial,
                key: Some(candidate.key.clone()),
            });
        }
        debug!(
            restore_key = restore_key.as_str(),
            "no candidate for restore key"
        );
    }

    Ok(Resolution::none())
}
