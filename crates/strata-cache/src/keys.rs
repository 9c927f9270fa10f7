//! Object key layout: `{owner}/{repo}/{branch-ref}/{identifier}.tar`.

/// Key of the archive object for (scope, branch, identifier).
pub fn object_key(scope: &str, branch: &str, identifier: &str) -> String {
    format!("{scope}/{branch}/{identifier}.tar")
}

/// Prefix covering every object under a branch.
pub fn branch_prefix(scope: &str, branch: &str) -> String {
    format!("{scope}/{branch}/")
}

/// Prefix for restore-key candidates under a branch.
pub fn restore_prefix(scope: &str, branch: &str, restore_key: &str) -> String {
    format!("{scope}/{branch}/{restore_key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_layout() {
        assert_eq!(
            object_key("acme/frontends", "refs/heads/main", "tsc-v5-abc123"),
            "acme/frontends/refs/heads/main/tsc-v5-abc123.tar"
        );
    }

    #[test]
    fn test_restore_prefix_is_object_key_prefix() {
        let key = object_key("acme/frontends", "refs/heads/main", "tsc-v5-abc123");
        let prefix = restore_prefix("acme/frontends", "refs/heads/main", "tsc-v5");
        assert!(key.starts_with(&prefix));
    }

    #[test]
    fn test_branch_prefix_scopes_erase() {
        let key = object_key("acme/frontends", "refs/heads/main", "tsc");
        assert!(key.starts_with(&branch_prefix("acme/frontends", "refs/heads/main")));
        assert!(!key.starts_with(&branch_prefix("acme/frontends", "refs/heads/master")));
    }
}
