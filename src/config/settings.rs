//! Configuration settings for the playlist indexer.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub retry: RetrySettings,
    pub chunking: ChunkingSettings,
    pub vector_store: VectorStoreSettings,
    pub pipeline: PipelineSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory holding playlist transcript files (`{playlist_id}.json`).
    pub input_dir: String,
    /// Directory for per-playlist checkpoint files.
    pub checkpoint_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            input_dir: "out".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Expected embedding dimensions.
    pub dimensions: u32,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-ada-002".to_string(),
            dimensions: 1536,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_seconds: 60,
        }
    }
}

/// Backoff settings shared by embedding requests and vector fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum attempts per call (at least 1).
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Factor applied to the delay after each failed attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetrySettings {
    /// Build the retry policy described by these settings.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.initial_delay_ms),
            self.backoff_multiplier,
        )
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum aggregate character length of one chunk.
    pub max_chunk_length: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            max_chunk_length: 1000,
        }
    }
}

/// Vector store provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Pinecone index over HTTP.
    #[default]
    Pinecone,
    /// Process-local store, mostly useful for dry runs.
    Memory,
}

impl std::str::FromStr for VectorStoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pinecone" => Ok(VectorStoreProvider::Pinecone),
            "memory" => Ok(VectorStoreProvider::Memory),
            _ => Err(format!("Unknown vector store provider: {}", s)),
        }
    }
}

impl std::fmt::Display for VectorStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorStoreProvider::Pinecone => write!(f, "pinecone"),
            VectorStoreProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Backend to write to.
    pub provider: VectorStoreProvider,
    /// Data-plane host of the Pinecone index (overridden by `PINECONE_INDEX_HOST`).
    pub index_host: Option<String>,
    /// Optional namespace inside the index.
    pub namespace: Option<String>,
    /// Maximum payload size accepted by one upsert call.
    pub max_payload_bytes: usize,
    /// Assumed serialized size of one vector element.
    pub bytes_per_number: usize,
    /// Fraction of `max_payload_bytes` actually filled by a batch.
    pub payload_safety_margin: f64,
    /// Number of ids per fetch request.
    pub fetch_group_size: usize,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Pinecone,
            index_host: None,
            namespace: None,
            max_payload_bytes: 2 * 1024 * 1024,
            bytes_per_number: 8,
            payload_safety_margin: 0.9,
            fetch_group_size: 100,
            timeout_seconds: 60,
        }
    }
}

impl VectorStoreSettings {
    /// Byte budget for one batch once the safety margin is applied.
    pub fn effective_payload_bytes(&self) -> usize {
        let margin = self.payload_safety_margin.clamp(0.1, 1.0);
        ((self.max_payload_bytes as f64) * margin) as usize
    }
}

/// Orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Maximum number of videos processed at once.
    pub concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        if let Ok(host) = std::env::var("PINECONE_INDEX_HOST") {
            if !host.trim().is_empty() {
                settings.vector_store.index_host = Some(host.trim().to_string());
            }
        }

        Ok(settings)
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::IndexerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("playlist-indexer")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded input directory path.
    pub fn input_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.input_dir)
    }

    /// Get the expanded checkpoint directory path.
    pub fn checkpoint_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.checkpoint_dir)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::IndexerError;

        if self.chunking.max_chunk_length == 0 {
            return Err(IndexerError::Config(
                "chunking.max_chunk_length must be greater than 0".to_string(),
            ));
        }
        if self.retry.max_retries == 0 {
            return Err(IndexerError::Config(
                "retry.max_retries must be at least 1".to_string(),
            ));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(IndexerError::Config(
                "retry.backoff_multiplier must be a finite number >= 1".to_string(),
            ));
        }
        if self.pipeline.concurrency == 0 {
            return Err(IndexerError::Config(
                "pipeline.concurrency must be at least 1".to_string(),
            ));
        }
        if self.vector_store.max_payload_bytes == 0 {
            return Err(IndexerError::Config(
                "vector_store.max_payload_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let settings = Settings::default();
        assert_eq!(settings.embedding.dimensions, 1536);
        assert_eq!(settings.vector_store.max_payload_bytes, 2 * 1024 * 1024);
        assert_eq!(settings.chunking.max_chunk_length, 1000);
        assert_eq!(settings.pipeline.concurrency, 1);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [pipeline]
            concurrency = 4

            [vector_store]
            provider = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(settings.pipeline.concurrency, 4);
        assert_eq!(settings.vector_store.provider, VectorStoreProvider::Memory);
        assert_eq!(settings.retry.max_retries, 3);
        assert_eq!(settings.general.checkpoint_dir, "checkpoints");
    }

    #[test]
    fn test_effective_payload_applies_margin() {
        let store = VectorStoreSettings {
            max_payload_bytes: 1000,
            payload_safety_margin: 0.9,
            ..Default::default()
        };
        assert_eq!(store.effective_payload_bytes(), 900);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut settings = Settings::default();
        settings.pipeline.concurrency = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.retry.max_retries = 7;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.retry.max_retries, 7);
    }
}
