//! Data models for playlists and their transcripts.
//!
//! The field names follow the JSON written by the transcript fetcher:
//! `playlistItems[].contentDetails.videoId`, `snippet.title`, and a
//! `transcripts` map keyed by video id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single timed piece of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptPart {
    /// Spoken text. May be missing or empty in fetched data.
    #[serde(default)]
    pub text: Option<String>,
    /// Start time in seconds.
    #[serde(default)]
    pub start: f64,
    /// Duration in seconds.
    #[serde(default, alias = "dur")]
    pub duration: f64,
}

impl TranscriptPart {
    /// Create a new transcript part.
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: Some(text.into()),
            start,
            duration,
        }
    }

    /// The part's text, or `None` when it is missing or empty.
    /// Whitespace-only text is kept.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    /// Character length counted toward chunk limits.
    pub fn char_len(&self) -> usize {
        self.text().map(|t| t.chars().count()).unwrap_or(0)
    }
}

/// The full transcript of one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Video this transcript belongs to.
    #[serde(rename = "videoId", default)]
    pub video_id: String,
    /// Parts in chronological order.
    #[serde(rename = "transcript", alias = "parts", default)]
    pub parts: Vec<TranscriptPart>,
}

impl Transcript {
    /// Create a transcript from its parts.
    pub fn new(video_id: impl Into<String>, parts: Vec<TranscriptPart>) -> Self {
        Self {
            video_id: video_id.into(),
            parts,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetails {
    #[serde(default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    #[serde(default)]
    pub title: Option<String>,
}

/// One entry of a playlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    #[serde(default)]
    pub content_details: ContentDetails,
    #[serde(default)]
    pub snippet: Snippet,
}

impl PlaylistItem {
    /// Create a playlist item.
    pub fn new(video_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            content_details: ContentDetails {
                video_id: Some(video_id.into()),
            },
            snippet: Snippet {
                title: Some(title.into()),
            },
        }
    }

    /// Video id, if present and non-empty.
    pub fn video_id(&self) -> Option<&str> {
        self.content_details
            .video_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }

    /// Title, if present and non-empty.
    pub fn title(&self) -> Option<&str> {
        self.snippet.title.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// A playlist together with the transcripts fetched for its videos.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistWithTranscripts {
    pub playlist_id: String,
    #[serde(default)]
    pub playlist_items: Vec<PlaylistItem>,
    #[serde(default)]
    pub transcripts: BTreeMap<String, Transcript>,
}

impl PlaylistWithTranscripts {
    /// Transcript for a video, if one was fetched.
    pub fn transcript(&self, video_id: &str) -> Option<&Transcript> {
        self.transcripts.get(video_id)
    }
}
