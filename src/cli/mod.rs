//! CLI module for the playlist indexer.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Playlist Indexer - embed YouTube playlist transcripts into a vector index
///
/// Reads a playlist file produced by the transcript fetcher, embeds each
/// video's transcript in chunks and upserts the vectors, resuming from a
/// per-playlist checkpoint.
#[derive(Parser, Debug)]
#[command(name = "playlist-indexer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed a playlist's transcripts and upsert them into the vector store
    Upsert {
        /// Playlist ID or URL
        #[arg(env = "YOUTUBE_PLAYLIST_ID")]
        playlist: String,

        /// Read this playlist file instead of {input_dir}/{playlist}.json
        #[arg(short, long)]
        input: Option<String>,

        /// Number of videos processed at the same time
        #[arg(long)]
        concurrency: Option<usize>,

        /// Keep vectors in memory instead of writing to the index
        #[arg(long)]
        dry_run: bool,

        /// Discard the playlist's checkpoint before starting
        #[arg(long)]
        reset: bool,
    },

    /// Split a large playlist file into smaller chunk_N.json files
    Split {
        /// Playlist file to split
        input: String,

        /// Directory for the chunk files
        #[arg(short, long, default_value = "out/chunks")]
        output: String,

        /// Approximate size of each chunk file in megabytes
        #[arg(long, default_value = "10")]
        chunk_size_mb: u64,
    },

    /// Fetch stored vectors by id
    Fetch {
        /// Vector ids ({videoId}-{chunk}-{n})
        #[arg(required = true)]
        ids: Vec<String>,

        /// Print the vector values as well as the metadata
        #[arg(long)]
        values: bool,
    },

    /// Inspect or reset playlist checkpoints
    Checkpoint {
        #[command(subcommand)]
        action: CheckpointAction,
    },

    /// Check environment and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CheckpointAction {
    /// List the videos already indexed for a playlist
    Show {
        /// Playlist ID or URL
        playlist: String,
    },

    /// Forget progress for a playlist so every video is indexed again
    Reset {
        /// Playlist ID or URL
        playlist: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a configuration file with the current values
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
