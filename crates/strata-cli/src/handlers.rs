//! Command handlers.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use strata_cache::engine::{CacheEngine, RestoreRequest, RestoreState};
use strata_cache::store::S3Store;
use strata_core::{CacheConfig, Error, Result};
use strata_shard::{ShardSpec, shard_partitions};
use tracing::info;

fn load_config(path: &Path) -> Result<CacheConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read '{}': {e}", path.display())))?;
    let config: CacheConfig = serde_json::from_str(&raw)
        .map_err(|e| Error::Config(format!("failed to parse '{}': {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

async fn engine(config_path: &Path) -> Result<CacheEngine<S3Store>> {
    let config = load_config(config_path)?;
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;
    let client = aws_sdk_s3::Client::new(&aws_config);
    let store = S3Store::new(client, config.bucket.clone());
    CacheEngine::new(store, config)
}

#[allow(clippy::too_many_arguments)]
pub async fn restore(
    config_path: &Path,
    paths: Vec<String>,
    key: String,
    restore_keys: Vec<String>,
    restore_from_repo: Option<String>,
    working_directory: Option<String>,
    state_file: &Path,
) -> Result<()> {
    let engine = engine(config_path).await?;
    let state = engine
        .restore(RestoreRequest {
            paths,
            key,
            restore_keys,
            alternate_repo: restore_from_repo,
            working_subdir: working_directory,
        })
        .await?;

    std::fs::write(state_file, serde_json::to_vec_pretty(&state)?)?;
    info!(state_file = %state_file.display(), "recorded restore state");
    println!("{}", state.hit.as_str());
    Ok(())
}

pub async fn save(config_path: &Path, state_file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(state_file).map_err(|e| {
        Error::Config(format!(
            "failed to read state file '{}' (did restore run?): {e}",
            state_file.display()
        ))
    })?;
    let state: RestoreState = serde_json::from_str(&raw)?;

    let engine = engine(config_path).await?;
    engine.save(&state).await
}

pub async fn erase(config_path: &Path, branch: &str) -> Result<()> {
    let engine = engine(config_path).await?;
    let deleted = engine.erase(branch).await?;
    println!("deleted {deleted} objects");
    Ok(())
}

/// Work manifest for `shard`: independent partitions are sharded
/// separately and concatenated, in manifest order.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ShardManifest {
    partitions: Vec<Vec<String>>,
    #[serde(default)]
    versions: HashMap<String, String>,
}

pub fn shard(manifest_path: &Path, spec: &str) -> Result<()> {
    let spec = ShardSpec::parse(spec)?;
    let raw = std::fs::read_to_string(manifest_path)
        .map_err(|e| Error::Config(format!("failed to read '{}': {e}", manifest_path.display())))?;
    let manifest: ShardManifest = serde_json::from_str(&raw)
        .map_err(|e| Error::Config(format!("failed to parse '{}': {e}", manifest_path.display())))?;

    let items = shard_partitions(
        &manifest.partitions,
        |item: &String| manifest.versions.get(item).cloned().unwrap_or_default(),
        spec,
    );
    for item in items {
        println!("{item}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_manifest_with_unknown_field_rejected() {
        let raw = r#"{"partitions": [["a"]], "versions": {"a": "1"}, "extra": 1}"#;
        assert!(serde_json::from_str::<ShardManifest>(raw).is_err());
    }

    #[test]
    fn test_load_config_rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"bucket\": 42}").unwrap();
        assert!(load_config(file.path()).is_err());
    }
}
