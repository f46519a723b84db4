//! Split command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::transcript::split_playlist_file;
use anyhow::Result;

/// Run the split command.
pub async fn run_split(input: &str, output: &str, chunk_size_mb: u64) -> Result<()> {
    let input = Settings::expand_path(input);
    let output = Settings::expand_path(output);

    let spinner = Output::spinner(&format!("Splitting {}...", input.display()));
    let written = split_playlist_file(&input, &output, chunk_size_mb).await;
    spinner.finish_and_clear();
    let written = written?;

    if written.is_empty() {
        Output::warning("Playlist has no items; nothing written");
        return Ok(());
    }

    for path in &written {
        Output::list_item(&path.display().to_string());
    }
    Output::success(&format!(
        "Wrote {} file(s) to {}",
        written.len(),
        output.display()
    ));
    Ok(())
}
