//! CLI command definitions.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Restore cached paths for a key.
    Restore {
        /// Comma-separated glob paths the paired save will archive.
        #[arg(long, value_delimiter = ',', required = true)]
        path: Vec<String>,
        /// Primary cache key.
        #[arg(long)]
        key: String,
        /// Comma-separated restore-key prefixes, most specific first.
        #[arg(long, value_delimiter = ',')]
        restore_keys: Vec<String>,
        /// Restore from another repository's cache (cross-fork reuse).
        #[arg(long)]
        restore_from_repo: Option<String>,
        /// Subdirectory of the working directory to extract into.
        #[arg(long)]
        working_directory: Option<String>,
        /// Where to record the state the paired `save` consumes.
        #[arg(long, default_value = "strata-state.json")]
        state_file: PathBuf,
    },
    /// Upload the paths recorded by a previous restore.
    Save {
        #[arg(long, default_value = "strata-state.json")]
        state_file: PathBuf,
    },
    /// Delete all cache objects under a branch.
    Erase {
        /// Fully-qualified ref (e.g. refs/heads/feature-x).
        #[arg(long)]
        branch: String,
    },
    /// Print the work items for one shard, one per line.
    Shard {
        /// Work manifest (JSON): partitions plus an item-to-version map.
        #[arg(long)]
        manifest: PathBuf,
        /// Shard spec, "<current>/<total>", 1-based.
        #[arg(long)]
        spec: String,
    },
}
