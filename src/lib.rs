//! Playlist Indexer - YouTube transcripts into a vector index
//!
//! Takes a playlist file (video metadata plus timed transcript fragments),
//! cuts each transcript into bounded chunks, embeds every chunk and upserts
//! the vectors with their metadata into a vector index.
//!
//! # Overview
//!
//! - Chunks never exceed a character budget, except for a single oversized part
//! - Embedding calls retry throttling and timeouts with exponential backoff
//! - Upserts are batched under the store's payload limit
//! - A per-playlist checkpoint makes runs resumable and idempotent
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `transcript` - Playlist and transcript model, file source, splitting
//! - `chunking` - Length-bounded transcript chunking
//! - `retry` - Bounded retry with backoff
//! - `embedding` - Embedding provider and retrying client
//! - `vector_store` - Vector store abstraction and payload batching
//! - `checkpoint` - Resumable per-playlist progress
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use playlist_indexer::config::Settings;
//! use playlist_indexer::orchestrator::Orchestrator;
//! use playlist_indexer::transcript::{JsonFileSource, TranscriptSource};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let playlist = JsonFileSource::new(settings.input_dir())
//!         .load_playlist("PLk1Sqn_f33Ku")
//!         .await?;
//!
//!     let orchestrator = Orchestrator::from_settings(&settings)?;
//!     let report = orchestrator.run(&playlist).await?;
//!     println!("Indexed {} videos", report.processed.len());
//!
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod transcript;
pub mod vector_store;

pub use error::{IndexerError, Result};
