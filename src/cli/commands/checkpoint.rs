//! Checkpoint command implementation.

use crate::checkpoint::{CheckpointStore, FileCheckpointStore};
use crate::cli::{CheckpointAction, Output};
use crate::config::Settings;
use crate::transcript::parse_playlist_id;
use anyhow::{anyhow, Result};

/// Run the checkpoint command.
pub async fn run_checkpoint(action: &CheckpointAction, settings: Settings) -> Result<()> {
    let store = FileCheckpointStore::new(settings.checkpoint_dir());

    match action {
        CheckpointAction::Show { playlist } => {
            let playlist_id = playlist_id(playlist)?;
            let completed = store.load(&playlist_id).await;

            Output::header(&format!("Checkpoint for {}", playlist_id));
            Output::kv("File", &store.path(&playlist_id)?.display().to_string());
            Output::kv("Videos indexed", &completed.len().to_string());
            for video_id in &completed {
                Output::list_item(video_id);
            }
        }

        CheckpointAction::Reset { playlist } => {
            let playlist_id = playlist_id(playlist)?;
            store.reset(&playlist_id).await?;
            Output::success(&format!("Checkpoint for {} cleared", playlist_id));
        }
    }

    Ok(())
}

fn playlist_id(input: &str) -> Result<String> {
    parse_playlist_id(input).ok_or_else(|| anyhow!("Could not parse a playlist id from '{}'", input))
}
