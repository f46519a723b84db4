//! Vector store abstraction.
//!
//! Records are keyed by a deterministic id so that re-running a playlist
//! overwrites earlier writes instead of duplicating them.

mod batch;
mod memory;
mod pinecone;

pub use batch::{PayloadBatch, PayloadBatcher};
pub use memory::MemoryVectorStore;
pub use pinecone::PineconeStore;

use crate::error::{IndexerError, Result};
use crate::retry::{retry, AttemptOutcome, RetryPolicy, Sleeper};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Metadata stored next to each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub video_id: String,
    pub title: String,
    /// Index of the chunk the vector was computed from.
    pub part_index: usize,
    /// Text of the chunk.
    pub transcript_part: String,
    /// Start time of the chunk in seconds.
    #[serde(default)]
    pub start: f64,
}

/// One vector to write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecordMetadata>,
}

impl UpsertRecord {
    /// Build the id for vector `vector_index` of chunk `chunk_index`.
    pub fn record_id(video_id: &str, chunk_index: usize, vector_index: usize) -> String {
        format!("{}-{}-{}", video_id, chunk_index, vector_index)
    }
}

/// A vector as returned by a lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVector {
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Option<RecordMetadata>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite records; returns how many were written.
    async fn upsert(&self, records: &[UpsertRecord]) -> Result<usize>;

    /// Look up records by id. Unknown ids are absent from the result.
    async fn fetch(&self, ids: &[String]) -> Result<HashMap<String, StoredVector>>;
}

/// Map a store result onto the retry machine.
///
/// Only an unavailable store and transport timeouts are worth another attempt.
fn attempt_outcome<T>(result: Result<T>) -> AttemptOutcome<T> {
    match result {
        Ok(value) => AttemptOutcome::Success(value),
        Err(IndexerError::StoreUnavailable(detail)) => AttemptOutcome::Retryable(detail),
        Err(IndexerError::Http(e)) if e.is_timeout() || e.is_connect() => {
            AttemptOutcome::Retryable(e.to_string())
        }
        Err(err) => AttemptOutcome::Fatal(err),
    }
}

/// Upsert one batch, retrying while the store is unavailable.
pub async fn upsert_with_retry(
    store: &dyn VectorStore,
    records: &[UpsertRecord],
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<usize> {
    retry(policy, sleeper, "upsert batch", |_| async move {
        attempt_outcome(store.upsert(records).await)
    })
    .await
}

/// Fetch `ids` in groups of `group_size`, retrying each group.
///
/// Ids the store does not know are simply absent from the result.
#[instrument(skip(store, ids, policy, sleeper), fields(count = ids.len()))]
pub async fn fetch_with_retry(
    store: &dyn VectorStore,
    ids: &[String],
    group_size: usize,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<HashMap<String, StoredVector>> {
    let mut found = HashMap::with_capacity(ids.len());

    for (n, group) in ids.chunks(group_size.max(1)).enumerate() {
        let label = format!("fetch group {}", n);
        let vectors = retry(policy, sleeper, &label, |_| async move {
            attempt_outcome(store.fetch(group).await)
        })
        .await?;

        debug!("Fetched {} of {} vectors in group {}", vectors.len(), group.len(), n);
        found.extend(vectors);
    }

    info!("Fetched {} of {} vectors", found.len(), ids.len());
    Ok(found)
}
