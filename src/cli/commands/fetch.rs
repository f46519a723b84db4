//! Fetch command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::build_vector_store;
use crate::retry::TokioSleeper;
use crate::vector_store::fetch_with_retry;
use anyhow::Result;

/// Run the fetch command.
pub async fn run_fetch(ids: &[String], show_values: bool, settings: Settings) -> Result<()> {
    preflight::check(Operation::Fetch, &settings)?;

    let store = build_vector_store(&settings)?;
    let spinner = Output::spinner(&format!("Fetching {} vector(s)...", ids.len()));
    let found = fetch_with_retry(
        store.as_ref(),
        ids,
        settings.vector_store.fetch_group_size,
        &settings.retry.policy(),
        &TokioSleeper,
    )
    .await;
    spinner.finish_and_clear();
    let found = found?;

    for id in ids {
        match found.get(id) {
            Some(vector) => Output::vector_info(id, vector, show_values),
            None => Output::warning(&format!("{} not found", id)),
        }
    }

    Output::info(&format!("Found {} of {} vector(s)", found.len(), ids.len()));
    Ok(())
}
