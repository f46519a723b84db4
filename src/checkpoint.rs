//! Per-playlist record of fully indexed videos.
//!
//! A checkpoint is a JSON array of video ids stored in one file per playlist.
//! Reading is permissive: a missing or corrupt file is an empty checkpoint.
//! Writing replaces the whole file atomically.

use crate::error::{IndexerError, Result};
use crate::transcript::is_valid_playlist_id;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Durable storage for checkpoints.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Ids already completed for a playlist. Never fails; unreadable state is empty.
    async fn load(&self, playlist_id: &str) -> BTreeSet<String>;

    /// Replace the stored set for a playlist. Returns once the data is durable.
    async fn save(&self, playlist_id: &str, video_ids: &BTreeSet<String>) -> Result<()>;

    /// Forget everything recorded for a playlist.
    async fn reset(&self, playlist_id: &str) -> Result<()>;
}

/// Checkpoints stored as `{dir}/{playlist_id}.json`.
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of a playlist's checkpoint file.
    ///
    /// Fails for ids that could point outside the checkpoint directory.
    pub fn path(&self, playlist_id: &str) -> Result<PathBuf> {
        if !is_valid_playlist_id(playlist_id) {
            return Err(IndexerError::InvalidInput(format!(
                "invalid playlist id '{}'",
                playlist_id
            )));
        }
        Ok(self.dir.join(format!("{}.json", playlist_id)))
    }
}

fn write_atomically(dir: &Path, path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self, playlist_id: &str) -> BTreeSet<String> {
        let path = match self.path(playlist_id) {
            Ok(path) => path,
            Err(e) => {
                warn!("Ignoring checkpoint: {}", e);
                return BTreeSet::new();
            }
        };
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No checkpoint at {}", path.display());
                return BTreeSet::new();
            }
            Err(e) => {
                warn!("Ignoring unreadable checkpoint {}: {}", path.display(), e);
                return BTreeSet::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&content) {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                warn!("Ignoring corrupt checkpoint {}: {}", path.display(), e);
                BTreeSet::new()
            }
        }
    }

    #[instrument(skip(self, video_ids), fields(count = video_ids.len()))]
    async fn save(&self, playlist_id: &str, video_ids: &BTreeSet<String>) -> Result<()> {
        let path = self.path(playlist_id)?;
        let ids: Vec<&String> = video_ids.iter().collect();
        let json = serde_json::to_vec_pretty(&ids)?;
        let dir = self.dir.clone();

        tokio::task::spawn_blocking(move || write_atomically(&dir, &path, &json))
            .await
            .map_err(|e| IndexerError::Checkpoint(format!("checkpoint writer panicked: {}", e)))??;

        debug!("Checkpoint saved");
        Ok(())
    }

    async fn reset(&self, playlist_id: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path(playlist_id)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The completed set for one playlist run.
///
/// Every [`record`](Self::record) inserts under a lock and persists the full
/// set before releasing it, so concurrent completions can never produce a
/// checkpoint that is missing an earlier video.
pub struct CheckpointTracker {
    store: Arc<dyn CheckpointStore>,
    playlist_id: String,
    completed: Mutex<BTreeSet<String>>,
}

impl CheckpointTracker {
    /// Load the existing checkpoint for `playlist_id`.
    pub async fn load(store: Arc<dyn CheckpointStore>, playlist_id: &str) -> Self {
        let completed = store.load(playlist_id).await;
        if !completed.is_empty() {
            info!(
                "Resuming playlist {} with {} video(s) already done",
                playlist_id,
                completed.len()
            );
        }
        Self {
            store,
            playlist_id: playlist_id.to_string(),
            completed: Mutex::new(completed),
        }
    }

    /// Current completed set.
    pub async fn snapshot(&self) -> BTreeSet<String> {
        self.completed.lock().await.clone()
    }

    /// Mark a video done and persist the full set.
    ///
    /// If persisting fails the video is removed again so the in-memory set
    /// never runs ahead of what is on disk.
    pub async fn record(&self, video_id: &str) -> Result<()> {
        let mut completed = self.completed.lock().await;
        let inserted = completed.insert(video_id.to_string());

        if let Err(e) = self.store.save(&self.playlist_id, &completed).await {
            if inserted {
                completed.remove(video_id);
            }
            return Err(IndexerError::Checkpoint(format!(
                "failed to save checkpoint after {}: {}",
                video_id, e
            )));
        }
        Ok(())
    }
}
