//! Playlist indexer CLI entry point.

use anyhow::Result;
use clap::Parser;
use playlist_indexer::cli::{commands, Cli, Commands};
use playlist_indexer::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("playlist_indexer={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match &cli.command {
        Commands::Upsert {
            playlist,
            input,
            concurrency,
            dry_run,
            reset,
        } => {
            commands::run_upsert(playlist, input.clone(), *concurrency, *dry_run, *reset, settings)
                .await?;
        }

        Commands::Split {
            input,
            output,
            chunk_size_mb,
        } => {
            commands::run_split(input, output, *chunk_size_mb).await?;
        }

        Commands::Fetch { ids, values } => {
            commands::run_fetch(ids, *values, settings).await?;
        }

        Commands::Checkpoint { action } => {
            commands::run_checkpoint(action, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path, settings)?;
        }
    }

    Ok(())
}
