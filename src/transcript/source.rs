//! Where playlists and transcripts come from.

use super::PlaylistWithTranscripts;
use crate::error::{IndexerError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Supplies a playlist and its transcripts.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Load the playlist with the given id.
    async fn load_playlist(&self, playlist_id: &str) -> Result<PlaylistWithTranscripts>;
}

/// Reads `{dir}/{playlist_id}.json` files written by the transcript fetcher.
pub struct JsonFileSource {
    dir: PathBuf,
}

impl JsonFileSource {
    /// Create a source rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file holding a playlist.
    pub fn playlist_path(&self, playlist_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", playlist_id))
    }

    /// Read a playlist file from an explicit path.
    pub async fn read_file(path: &Path) -> Result<PlaylistWithTranscripts> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            IndexerError::Transcript(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let playlist: PlaylistWithTranscripts = serde_json::from_str(&content).map_err(|e| {
            IndexerError::Transcript(format!("Cannot parse {}: {}", path.display(), e))
        })?;
        Ok(playlist)
    }
}

#[async_trait]
impl TranscriptSource for JsonFileSource {
    #[instrument(skip(self))]
    async fn load_playlist(&self, playlist_id: &str) -> Result<PlaylistWithTranscripts> {
        if !is_valid_playlist_id(playlist_id) {
            return Err(IndexerError::InvalidInput(format!(
                "invalid playlist id '{}'",
                playlist_id
            )));
        }
        let path = self.playlist_path(playlist_id);
        let mut playlist = Self::read_file(&path).await?;

        if playlist.playlist_id.is_empty() {
            playlist.playlist_id = playlist_id.to_string();
        }

        info!(
            "Loaded playlist {} ({} items, {} transcripts) from {}",
            playlist.playlist_id,
            playlist.playlist_items.len(),
            playlist.transcripts.len(),
            path.display()
        );
        Ok(playlist)
    }
}

/// Whether `id` is a bare playlist id: ASCII letters, digits, `_` and `-`.
///
/// Ids name files on disk, so anything else is refused.
pub fn is_valid_playlist_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Extract a playlist id from a playlist URL or a bare id.
pub fn parse_playlist_id(input: &str) -> Option<String> {
    let input = input.trim();
    let re = Regex::new(
        r"(?x)
        (?:[?&]list=([a-zA-Z0-9_-]+))
        |
        ^([a-zA-Z0-9_-]+)$
    ",
    )
    .ok()?;
    let caps = re.captures(input)?;

    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}
