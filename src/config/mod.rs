//! Configuration module for the playlist indexer.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, PipelineSettings, RetrySettings,
    Settings, VectorStoreProvider, VectorStoreSettings,
};
