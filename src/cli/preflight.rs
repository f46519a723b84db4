//! Pre-flight checks before expensive operations.
//!
//! Validates that credentials and configuration are present before a run
//! starts, so a missing key fails fast instead of on the first request.

use crate::config::{Settings, VectorStoreProvider};
use crate::error::{IndexerError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Upserting needs the embedding key and, for Pinecone, the index.
    Upsert,
    /// Fetching needs the vector store only.
    Fetch,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    settings.validate()?;
    match operation {
        Operation::Upsert => {
            check_env("OPENAI_API_KEY", "sk-...")?;
            check_vector_store(settings)?;
        }
        Operation::Fetch => check_vector_store(settings)?,
    }
    Ok(())
}

fn check_vector_store(settings: &Settings) -> Result<()> {
    if settings.vector_store.provider != VectorStoreProvider::Pinecone {
        return Ok(());
    }
    check_env("PINECONE_API_KEY", "...")?;
    match settings.vector_store.index_host.as_deref() {
        Some(host) if !host.trim().is_empty() => Ok(()),
        _ => Err(IndexerError::Config(
            "Pinecone index host not set. Set it with: export PINECONE_INDEX_HOST='my-index-xxxx.svc.pinecone.io'"
                .to_string(),
        )),
    }
}

/// Check that an environment variable is set and non-empty.
fn check_env(name: &str, example: &str) -> Result<()> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(()),
        Ok(_) => Err(IndexerError::Config(format!(
            "{} is empty. Set it with: export {}='{}'",
            name, name, example
        ))),
        Err(_) => Err(IndexerError::Config(format!(
            "{} not set. Set it with: export {}='{}'",
            name, name, example
        ))),
    }
}
