//! In-memory vector store implementation.
//!
//! Useful for testing and dry runs.

use super::{StoredVector, UpsertRecord, VectorStore};
use crate::error::{IndexerError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// In-memory vector store.
pub struct MemoryVectorStore {
    vectors: RwLock<HashMap<String, StoredVector>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            vectors: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the full contents, ordered by id.
    pub fn snapshot(&self) -> BTreeMap<String, StoredVector> {
        self.vectors
            .read()
            .map(|v| v.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> IndexerError {
    IndexerError::VectorStore("memory store lock poisoned".to_string())
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, records: &[UpsertRecord]) -> Result<usize> {
        let mut store = self.vectors.write().map_err(|_| poisoned())?;
        for record in records {
            store.insert(
                record.id.clone(),
                StoredVector {
                    values: record.values.clone(),
                    metadata: record.metadata.clone(),
                },
            );
        }
        Ok(records.len())
    }

    async fn fetch(&self, ids: &[String]) -> Result<HashMap<String, StoredVector>> {
        let store = self.vectors.read().map_err(|_| poisoned())?;
        Ok(ids
            .iter()
            .filter_map(|id| store.get(id).map(|v| (id.clone(), v.clone())))
            .collect())
    }
}
