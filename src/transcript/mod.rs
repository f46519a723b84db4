//! Playlists, transcripts, and the source they are loaded from.

mod models;
mod source;
mod split;

pub use models::{
    ContentDetails, PlaylistItem, PlaylistWithTranscripts, Snippet, Transcript, TranscriptPart,
};
pub use source::{is_valid_playlist_id, parse_playlist_id, JsonFileSource, TranscriptSource};
pub use split::{partition_playlist, split_playlist_file};
