//! Error types for the playlist indexer.

use thiserror::Error;

/// Library-level error type for indexing operations.
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transcript source error: {0}")]
    Transcript(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Invalid embedding for video {video_id} chunk {chunk_index}: {detail}")]
    Validation {
        video_id: String,
        chunk_index: usize,
        detail: String,
    },

    #[error("Gave up after {attempts} attempts: {last}")]
    RetryExhausted { attempts: u32, last: String },

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for indexer operations.
pub type Result<T> = std::result::Result<T, IndexerError>;
