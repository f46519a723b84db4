//! Splitting transcripts into bounded-length chunks for embedding.
//!
//! A chunk is a contiguous run of transcript parts. Parts are never split, so
//! a single part longer than the limit becomes a chunk of its own.

mod length;

pub use length::LengthChunker;

use crate::transcript::TranscriptPart;
use serde::{Deserialize, Serialize};

/// A contiguous slice of one video's transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    /// Video the chunk came from.
    pub video_id: String,
    /// Position of this chunk within the video.
    pub index: usize,
    /// Parts in their original order.
    pub parts: Vec<TranscriptPart>,
    /// Sum of the parts' character lengths.
    pub char_len: usize,
}

impl TranscriptChunk {
    /// Text of all parts joined with single spaces.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Start time of the first part.
    pub fn start_seconds(&self) -> f64 {
        self.parts.first().map(|p| p.start).unwrap_or(0.0)
    }
}

/// Chunks produced for one transcript.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkOutcome {
    /// Chunks in transcript order.
    pub chunks: Vec<TranscriptChunk>,
    /// Parts dropped because their text was missing or empty.
    pub skipped_parts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_text_and_start() {
        let chunk = TranscriptChunk {
            video_id: "v".to_string(),
            index: 0,
            parts: vec![
                TranscriptPart::new("hello", 125.0, 2.0),
                TranscriptPart::new("world", 127.0, 3.0),
            ],
            char_len: 10,
        };

        assert_eq!(chunk.text(), "hello world");
        assert_eq!(chunk.start_seconds(), 125.0);
    }
}
