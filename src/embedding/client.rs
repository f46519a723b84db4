//! Retrying, validating wrapper around an [`EmbeddingProvider`].

use super::{EmbeddingProvider, ProviderError};
use crate::chunking::TranscriptChunk;
use crate::error::{IndexerError, Result};
use crate::retry::{retry, AttemptOutcome, RetryPolicy, Sleeper, TokioSleeper};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Vectors produced for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkEmbedding {
    /// Index of the source chunk within its video.
    pub chunk_index: usize,
    /// One or more vectors, in provider order.
    pub vectors: Vec<Vec<f32>>,
}

/// Embedding client with bounded retries and output validation.
///
/// Throttling and timeouts are retried with exponential backoff. Rejected
/// requests fail immediately. Responses with missing or non-finite values are
/// reported as [`IndexerError::Validation`] and never retried.
#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    request_timeout: Option<Duration>,
    expected_dimensions: Option<usize>,
}

impl EmbeddingClient {
    /// Create a client that waits on the tokio timer.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            sleeper: Arc::new(TokioSleeper),
            request_timeout: None,
            expected_dimensions: None,
        }
    }

    /// Replace the sleeper used between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Bound every provider call; an expired call counts as a retryable failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Require every vector to have exactly `dimensions` elements.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.expected_dimensions = Some(dimensions);
        self
    }

    /// Embed one chunk.
    #[instrument(skip(self, chunk), fields(video_id = %chunk.video_id, chunk = chunk.index))]
    pub async fn embed_chunk(&self, chunk: &TranscriptChunk) -> Result<ChunkEmbedding> {
        let label = format!("embedding {}#{}", chunk.video_id, chunk.index);
        let raw = self.request(&chunk.text(), &label).await?;

        let vectors = raw
            .and_then(|vectors| validate(vectors, self.expected_dimensions))
            .map_err(|detail| IndexerError::Validation {
                video_id: chunk.video_id.clone(),
                chunk_index: chunk.index,
                detail,
            })?;

        debug!("Chunk embedded into {} vector(s)", vectors.len());
        Ok(ChunkEmbedding {
            chunk_index: chunk.index,
            vectors,
        })
    }

    /// Embed chunks one after another, preserving chunk order.
    pub async fn embed_chunks(&self, chunks: &[TranscriptChunk]) -> Result<Vec<ChunkEmbedding>> {
        let mut embeddings = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            embeddings.push(self.embed_chunk(chunk).await?);
        }
        Ok(embeddings)
    }

    /// Call the provider under the retry policy.
    ///
    /// The inner `Err` carries a malformed-response description; those are
    /// returned without retrying so the caller can attach context.
    async fn request(
        &self,
        text: &str,
        label: &str,
    ) -> Result<std::result::Result<Vec<Vec<f64>>, String>> {
        retry(&self.policy, self.sleeper.as_ref(), label, |_| async move {
            let outcome = match self.request_timeout {
                Some(limit) => match tokio::time::timeout(limit, self.provider.embed(text)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(format!("no response within {:?}", limit))),
                },
                None => self.provider.embed(text).await,
            };

            match outcome {
                Ok(vectors) => AttemptOutcome::Success(Ok(vectors)),
                Err(ProviderError::Malformed(detail)) => AttemptOutcome::Success(Err(detail)),
                Err(err) if err.is_retryable() => AttemptOutcome::Retryable(err.to_string()),
                Err(err) => AttemptOutcome::Fatal(IndexerError::Embedding(err.to_string())),
            }
        })
        .await
    }
}

/// Check that the provider returned at least one vector and that every
/// element fits in a finite `f32`.
fn validate(
    raw: Vec<Vec<f64>>,
    expected_dimensions: Option<usize>,
) -> std::result::Result<Vec<Vec<f32>>, String> {
    if raw.is_empty() {
        return Err("provider returned no vectors".to_string());
    }

    let dimensions = expected_dimensions.unwrap_or(raw[0].len());
    let mut vectors = Vec::with_capacity(raw.len());

    for (v, values) in raw.into_iter().enumerate() {
        if values.is_empty() {
            return Err(format!("vector {} is empty", v));
        }
        if values.len() != dimensions {
            return Err(format!(
                "vector {} has {} dimensions, expected {}",
                v,
                values.len(),
                dimensions
            ));
        }

        let mut vector = Vec::with_capacity(values.len());
        for (i, value) in values.into_iter().enumerate() {
            let narrowed = value as f32;
            if !value.is_finite() || !narrowed.is_finite() {
                return Err(format!("vector {} element {} is not finite ({})", v, i, value));
            }
            vector.push(narrowed);
        }
        vectors.push(vector);
    }

    Ok(vectors)
}
