//! Strata CLI entrypoint.

use clap::Parser;
use std::path::PathBuf;

mod commands;
mod handlers;

use commands::Commands;

#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about = "Strata build cache command-line interface", long_about = None)]
struct Cli {
    /// Cache configuration file (JSON).
    #[arg(long, global = true, default_value = "strata.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Restore {
            path,
            key,
            restore_keys,
            restore_from_repo,
            working_directory,
            state_file,
        } => {
            handlers::restore(
                &cli.config,
                path,
                key,
                restore_keys,
                restore_from_repo,
                working_directory,
                &state_file,
            )
            .await?
        }
        Commands::Save { state_file } => handlers::save(&cli.config, &state_file).await?,
        Commands::Erase { branch } => handlers::erase(&cli.config, &branch).await?,
        Commands::Shard { manifest, spec } => handlers::shard(&manifest, &spec)?,
    }

    Ok(())
}
