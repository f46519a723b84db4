//! Embedding generation for transcript chunks.
//!
//! [`EmbeddingProvider`] is the raw remote API; [`EmbeddingClient`] layers
//! retries, timeouts and vector validation on top of it.

mod client;
mod openai;

pub use client::{ChunkEmbedding, EmbeddingClient};
pub use openai::OpenAIProvider;

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by an embedding provider, classified for retrying.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider asked us to slow down (HTTP 429 and friends).
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection resets, 5xx responses.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The request itself is wrong; retrying will not help.
    #[error("request rejected: {0}")]
    Fatal(String),

    /// The provider answered but the payload is not a list of vectors.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Whether waiting and trying again might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited(_) | ProviderError::Timeout(_) | ProviderError::Transient(_)
        )
    }
}

/// A remote service that maps text to vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text. Most providers return a single vector; values are
    /// returned unvalidated.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<Vec<f64>>, ProviderError>;
}
