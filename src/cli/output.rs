//! CLI output formatting utilities.

use crate::orchestrator::RunReport;
use crate::vector_store::StoredVector;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a fetched vector.
    pub fn vector_info(id: &str, vector: &StoredVector, show_values: bool) {
        match &vector.metadata {
            Some(meta) => {
                println!(
                    "\n{} {} @ {} ({}, {} dims)",
                    style(">>").green(),
                    style(&meta.title).bold(),
                    style(format_duration(meta.start)).cyan(),
                    style(id).dim(),
                    vector.values.len()
                );
                println!("   {}", content_preview(&meta.transcript_part, 200));
            }
            None => println!(
                "\n{} {} ({} dims, no metadata)",
                style(">>").green(),
                style(id).bold(),
                vector.values.len()
            ),
        }
        if show_values {
            println!("   {}", style(format!("{:?}", vector.values)).dim());
        }
    }

    /// Print the summary of a playlist run.
    pub fn run_report(report: &RunReport) {
        Output::header(&format!("Playlist {}", report.playlist_id));
        Output::kv("Processed", &report.processed.len().to_string());
        Output::kv("Vectors upserted", &report.vectors_upserted.to_string());
        Output::kv("Skipped", &report.skipped.to_string());
        Output::kv("Without embeddings", &report.zero_embedding.len().to_string());
        Output::kv("Parts without text", &report.skipped_parts.to_string());
        Output::kv("Failed", &report.failed.len().to_string());
        Output::kv("Failed batches", &report.failed_batches.to_string());
        if report.cancelled > 0 {
            Output::kv("Not started", &report.cancelled.to_string());
        }
        let elapsed = report.elapsed().num_milliseconds().max(0) as f64 / 1000.0;
        Output::kv("Elapsed", &format_duration(elapsed));

        for video_id in &report.zero_embedding {
            Output::list_item(&format!("{} had no text to embed", style(video_id).dim()));
        }
        for failed in &report.failed {
            println!(
                "  {} {} ({}) failed while {}: {}",
                style("x").red(),
                style(&failed.title).bold(),
                style(&failed.video_id).dim(),
                failed.stage,
                failed.error
            );
        }
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        if let Ok(bar_style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("#>-"));
        }
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format duration in seconds to a human-readable string.
fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
