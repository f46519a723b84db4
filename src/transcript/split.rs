//! Splitting oversized playlist files into smaller ones.

use super::{JsonFileSource, PlaylistWithTranscripts};
use crate::error::{IndexerError, Result};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Split the playlist file at `input` into files of roughly `chunk_size_mb`.
///
/// Items are spread evenly over `ceil(file_size / chunk_size)` files named
/// `chunk_{n}.json` in `output_dir`. Each file keeps the playlist id and only
/// the transcripts of its own items. Returns the written paths in order.
#[instrument(skip_all, fields(input = %input.display()))]
pub async fn split_playlist_file(
    input: &Path,
    output_dir: &Path,
    chunk_size_mb: u64,
) -> Result<Vec<PathBuf>> {
    if chunk_size_mb == 0 {
        return Err(IndexerError::InvalidInput(
            "chunk size must be at least 1 MB".to_string(),
        ));
    }

    let file_size = tokio::fs::metadata(input).await?.len();
    let playlist = JsonFileSource::read_file(input).await?;

    let chunk_bytes = chunk_size_mb * 1024 * 1024;
    let file_count = file_size.div_ceil(chunk_bytes).max(1) as usize;
    let parts = partition_playlist(&playlist, file_count);

    tokio::fs::create_dir_all(output_dir).await?;

    let mut written = Vec::with_capacity(parts.len());
    for (n, part) in parts.iter().enumerate() {
        let path = output_dir.join(format!("chunk_{}.json", n));
        let json = serde_json::to_string_pretty(part)?;
        tokio::fs::write(&path, json).await?;
        info!(
            "Created {} ({} items)",
            path.display(),
            part.playlist_items.len()
        );
        written.push(path);
    }

    Ok(written)
}

/// Spread a playlist's items over `file_count` playlists of near-equal size.
pub fn partition_playlist(
    playlist: &PlaylistWithTranscripts,
    file_count: usize,
) -> Vec<PlaylistWithTranscripts> {
    let total = playlist.playlist_items.len();
    if total == 0 {
        return Vec::new();
    }
    let per_file = total.div_ceil(file_count.max(1));

    playlist
        .playlist_items
        .chunks(per_file)
        .map(|items| {
            let transcripts = items
                .iter()
                .filter_map(|item| item.video_id())
                .filter_map(|id| {
                    playlist
                        .transcripts
                        .get(id)
                        .map(|t| (id.to_string(), t.clone()))
                })
                .collect();

            PlaylistWithTranscripts {
                playlist_id: playlist.playlist_id.clone(),
                playlist_items: items.to_vec(),
                transcripts,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{PlaylistItem, Transcript, TranscriptPart};

    fn playlist(n: usize) -> PlaylistWithTranscripts {
        let mut playlist = PlaylistWithTranscripts {
            playlist_id: "PL".to_string(),
            ..Default::default()
        };
        for i in 0..n {
            let id = format!("v{}", i);
            playlist
                .playlist_items
                .push(PlaylistItem::new(id.clone(), format!("Video {}", i)));
            playlist.transcripts.insert(
                id.clone(),
                Transcript::new(id, vec![TranscriptPart::new("hi", 0.0, 1.0)]),
            );
        }
        playlist
    }

    #[test]
    fn test_partition_keeps_matching_transcripts() {
        let parts = partition_playlist(&playlist(5), 2);

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].playlist_items.len(), 3);
        assert_eq!(parts[1].playlist_items.len(), 2);
        assert!(parts[1].transcripts.contains_key("v3"));
        assert!(!parts[1].transcripts.contains_key("v0"));
        assert!(parts.iter().all(|p| p.playlist_id == "PL"));
    }

    #[test]
    fn test_partition_empty_playlist() {
        assert!(partition_playlist(&playlist(0), 3).is_empty());
    }

    #[tokio::test]
    async fn test_small_file_yields_single_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("PL.json");
        std::fs::write(&input, serde_json::to_string(&playlist(3)).unwrap()).unwrap();

        let out = dir.path().join("chunks");
        let written = split_playlist_file(&input, &out, 100).await.unwrap();

        assert_eq!(written, vec![out.join("chunk_0.json")]);
        let back = JsonFileSource::read_file(&written[0]).await.unwrap();
        assert_eq!(back.playlist_items.len(), 3);
    }
}
