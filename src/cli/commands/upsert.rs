//! Upsert command implementation.

use crate::checkpoint::{CheckpointStore, FileCheckpointStore};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Settings, VectorStoreProvider};
use crate::orchestrator::Orchestrator;
use crate::transcript::{
    is_valid_playlist_id, parse_playlist_id, JsonFileSource, TranscriptSource,
};
use anyhow::{anyhow, bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};

/// What an interrupt should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptAction {
    /// Stop scheduling and let running videos finish.
    Drain,
    /// Exit now.
    ForceExit,
}

/// Flag shutdown on the first interrupt; any later one forces an exit.
fn on_interrupt(shutdown: &AtomicBool) -> InterruptAction {
    if shutdown.swap(true, Ordering::SeqCst) {
        InterruptAction::ForceExit
    } else {
        InterruptAction::Drain
    }
}

/// Run the upsert command.
pub async fn run_upsert(
    playlist: &str,
    input: Option<String>,
    concurrency: Option<usize>,
    dry_run: bool,
    reset: bool,
    mut settings: Settings,
) -> Result<()> {
    let playlist_id = parse_playlist_id(playlist)
        .ok_or_else(|| anyhow!("Could not parse a playlist id from '{}'", playlist))?;

    if let Some(n) = concurrency {
        settings.pipeline.concurrency = n;
    }
    if dry_run {
        settings.vector_store.provider = VectorStoreProvider::Memory;
    }

    if let Err(e) = preflight::check(Operation::Upsert, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'playlist-indexer doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let mut playlist = match input {
        Some(path) => JsonFileSource::read_file(&Settings::expand_path(&path)).await?,
        None => {
            JsonFileSource::new(settings.input_dir())
                .load_playlist(&playlist_id)
                .await?
        }
    };
    if playlist.playlist_id.is_empty() {
        playlist.playlist_id = playlist_id.clone();
    } else if !is_valid_playlist_id(&playlist.playlist_id) {
        bail!("File has an invalid playlist id '{}'", playlist.playlist_id);
    } else if playlist.playlist_id != playlist_id {
        Output::warning(&format!(
            "File belongs to playlist {}; checkpointing under that id",
            playlist.playlist_id
        ));
    }

    if reset {
        FileCheckpointStore::new(settings.checkpoint_dir())
            .reset(&playlist.playlist_id)
            .await?;
        Output::info(&format!("Checkpoint for {} cleared", playlist.playlist_id));
    }

    Output::header(&format!("Indexing playlist {}", playlist.playlist_id));
    Output::kv("Videos", &playlist.playlist_items.len().to_string());
    Output::kv("Model", &settings.embedding.model);
    Output::kv("Vector store", &settings.vector_store.provider.to_string());
    Output::kv("Concurrency", &settings.pipeline.concurrency.to_string());
    if dry_run {
        Output::warning("Dry run: vectors are kept in memory and discarded");
    }

    let pb = Output::progress_bar(0, "videos");
    let orchestrator = Orchestrator::from_settings(&settings)?.with_progress(pb.clone());

    let shutdown = orchestrator.shutdown_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt(&shutdown) {
                InterruptAction::Drain => Output::warning(
                    "Interrupted: finishing videos in progress, not starting new ones (Ctrl-C again to exit now)",
                ),
                InterruptAction::ForceExit => {
                    Output::error("Interrupted again: exiting without waiting");
                    std::process::exit(130);
                }
            }
        }
    });

    let report = orchestrator.run(&playlist).await;
    pb.finish_and_clear();
    let report = report?;

    Output::run_report(&report);

    if report.failed.is_empty() && report.cancelled == 0 {
        Output::success("Upsert completed");
    } else {
        Output::warning("Some videos were not indexed; run the command again to retry them");
    }

    Ok(())
}
