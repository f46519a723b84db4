//! Character-length chunking.
//!
//! Greedily packs consecutive parts into a chunk until the next part would
//! push the chunk over the limit.

use super::{ChunkOutcome, TranscriptChunk};
use crate::error::{IndexerError, Result};
use crate::transcript::{Transcript, TranscriptPart};
use tracing::warn;

/// Chunker bounded by aggregate character length.
#[derive(Debug, Clone)]
pub struct LengthChunker {
    max_chunk_length: usize,
}

impl LengthChunker {
    /// Create a chunker; `max_chunk_length` must be positive.
    pub fn new(max_chunk_length: usize) -> Result<Self> {
        if max_chunk_length == 0 {
            return Err(IndexerError::InvalidInput(
                "max chunk length must be greater than 0".to_string(),
            ));
        }
        Ok(Self { max_chunk_length })
    }

    /// Split a transcript into chunks.
    ///
    /// Parts without text are skipped and counted in
    /// [`ChunkOutcome::skipped_parts`]. An oversized part is kept whole in a
    /// chunk of its own.
    pub fn split(&self, transcript: &Transcript) -> ChunkOutcome {
        let mut outcome = ChunkOutcome::default();
        let mut buffer: Vec<TranscriptPart> = Vec::new();
        let mut buffer_len = 0usize;

        for part in &transcript.parts {
            let len = match part.text() {
                Some(_) => part.char_len(),
                None => {
                    outcome.skipped_parts += 1;
                    continue;
                }
            };

            if !buffer.is_empty() && buffer_len + len > self.max_chunk_length {
                let index = outcome.chunks.len();
                outcome.chunks.push(TranscriptChunk {
                    video_id: transcript.video_id.clone(),
                    index,
                    parts: std::mem::take(&mut buffer),
                    char_len: buffer_len,
                });
                buffer_len = 0;
            }

            buffer.push(part.clone());
            buffer_len += len;
        }

        if !buffer.is_empty() {
            let index = outcome.chunks.len();
            outcome.chunks.push(TranscriptChunk {
                video_id: transcript.video_id.clone(),
                index,
                parts: buffer,
                char_len: buffer_len,
            });
        }

        if outcome.skipped_parts > 0 {
            warn!(
                "Skipped {} transcript part(s) without text in video {}",
                outcome.skipped_parts, transcript.video_id
            );
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(text: &str, start: f64) -> TranscriptPart {
        TranscriptPart::new(text, start, 1.0)
    }

    #[test]
    fn test_rejects_zero_limit() {
        assert!(LengthChunker::new(0).is_err());
    }

    #[test]
    fn test_empty_transcript_yields_no_chunks() {
        let chunker = LengthChunker::new(10).unwrap();
        let outcome = chunker.split(&Transcript::new("v", vec![]));
        assert!(outcome.chunks.is_empty());
        assert_eq!(outcome.skipped_parts, 0);
    }

    #[test]
    fn test_overflow_starts_new_chunk() {
        let chunker = LengthChunker::new(1000).unwrap();
        let transcript = Transcript::new(
            "v1",
            vec![part(&"a".repeat(500), 0.0), part(&"b".repeat(600), 5.0)],
        );

        let outcome = chunker.split(&transcript);

        assert_eq!(outcome.chunks.len(), 2);
        assert_eq!(outcome.chunks[0].index, 0);
        assert_eq!(outcome.chunks[0].text(), "a".repeat(500));
        assert_eq!(outcome.chunks[1].index, 1);
        assert_eq!(outcome.chunks[1].text(), "b".repeat(600));
        assert_eq!(outcome.chunks[1].start_seconds(), 5.0);
    }

    #[test]
    fn test_exact_fit_stays_in_one_chunk() {
        let chunker = LengthChunker::new(10).unwrap();
        let transcript = Transcript::new("v", vec![part("aaaaa", 0.0), part("bbbbb", 1.0)]);

        let outcome = chunker.split(&transcript);
        assert_eq!(outcome.chunks.len(), 1);
        assert_eq!(outcome.chunks[0].char_len, 10);
    }

    #[test]
    fn test_oversized_part_becomes_its_own_chunk() {
        let chunker = LengthChunker::new(5).unwrap();
        let transcript = Transcript::new(
            "v",
            vec![part("ab", 0.0), part("0123456789", 1.0), part("cd", 2.0)],
        );

        let outcome = chunker.split(&transcript);

        let lens: Vec<usize> = outcome.chunks.iter().map(|c| c.char_len).collect();
        assert_eq!(lens, vec![2, 10, 2]);
        assert_eq!(outcome.chunks[1].parts.len(), 1);
    }

    #[test]
    fn test_oversized_first_part_does_not_emit_empty_chunk() {
        let chunker = LengthChunker::new(3).unwrap();
        let transcript = Transcript::new("v", vec![part("abcdef", 0.0)]);

        let outcome = chunker.split(&transcript);
        assert_eq!(outcome.chunks.len(), 1);
        assert!(!outcome.chunks[0].parts.is_empty());
    }

    #[test]
    fn test_empty_parts_are_skipped_and_counted() {
        let chunker = LengthChunker::new(100).unwrap();
        let mut missing = part("", 1.0);
        missing.text = None;
        let transcript = Transcript::new(
            "v",
            vec![part("one", 0.0), missing, part("", 2.0), part("two", 3.0)],
        );

        let outcome = chunker.split(&transcript);

        assert_eq!(outcome.skipped_parts, 2);
        assert_eq!(outcome.chunks.len(), 1);
        assert_eq!(outcome.chunks[0].text(), "one two");
    }

    #[test]
    fn test_whitespace_parts_are_kept() {
        let chunker = LengthChunker::new(100).unwrap();
        let transcript = Transcript::new("v", vec![part("one", 0.0), part(" ", 1.0), part("two", 2.0)]);

        let outcome = chunker.split(&transcript);

        assert_eq!(outcome.skipped_parts, 0);
        assert_eq!(outcome.chunks[0].parts.len(), 3);
        assert_eq!(outcome.chunks[0].char_len, 7);
    }

    #[test]
    fn test_chunks_partition_valid_parts_in_order() {
        let chunker = LengthChunker::new(7).unwrap();
        let texts = ["abc", "de", "fghij", "k", "", "lmnopqrs", "t", "uv"];
        let parts: Vec<TranscriptPart> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| part(t, i as f64))
            .collect();
        let transcript = Transcript::new("v", parts.clone());

        let outcome = chunker.split(&transcript);

        let rebuilt: Vec<TranscriptPart> = outcome
            .chunks
            .iter()
            .flat_map(|c| c.parts.iter().cloned())
            .collect();
        let valid: Vec<TranscriptPart> = parts.into_iter().filter(|p| p.text().is_some()).collect();
        assert_eq!(rebuilt, valid);

        for chunk in &outcome.chunks {
            assert!(chunk.char_len <= 7 || chunk.parts.len() == 1);
        }
        for (i, chunk) in outcome.chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }
}
