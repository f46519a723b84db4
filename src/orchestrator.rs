//! Pipeline orchestrator for playlist indexing.
//!
//! Runs every pending video of a playlist through
//! chunk -> embed -> batch -> upsert with a bounded number of videos in
//! flight, and checkpoints each video once all of its batches are stored.

use crate::checkpoint::{CheckpointStore, CheckpointTracker, FileCheckpointStore};
use crate::chunking::{LengthChunker, TranscriptChunk};
use crate::config::{Settings, VectorStoreProvider};
use crate::embedding::{ChunkEmbedding, EmbeddingClient, OpenAIProvider};
use crate::error::{IndexerError, Result};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::transcript::{is_valid_playlist_id, PlaylistWithTranscripts, Transcript};
use crate::vector_store::{
    upsert_with_retry, MemoryVectorStore, PayloadBatcher, PineconeStore, RecordMetadata,
    UpsertRecord, VectorStore,
};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use indicatif::ProgressBar;
use std::collections::{BTreeSet, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Tunables for one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum characters per chunk.
    pub max_chunk_length: usize,
    /// Byte budget per upsert call.
    pub max_payload_bytes: usize,
    /// Assumed serialized size of one vector element.
    pub bytes_per_number: usize,
    /// Videos processed at the same time.
    pub concurrency: usize,
    /// Attempts and backoff for each upsert batch.
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chunk_length: 1000,
            max_payload_bytes: 2 * 1024 * 1024,
            bytes_per_number: 8,
            concurrency: 1,
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_chunk_length: settings.chunking.max_chunk_length,
            max_payload_bytes: settings.vector_store.effective_payload_bytes(),
            bytes_per_number: settings.vector_store.bytes_per_number,
            concurrency: settings.pipeline.concurrency,
            retry: settings.retry.policy(),
        }
    }
}

/// Where a video is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoState {
    Pending,
    Embedding,
    Batching,
    Upserting,
    Done,
    Failed,
}

impl std::fmt::Display for VideoState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VideoState::Pending => "pending",
            VideoState::Embedding => "embedding",
            VideoState::Batching => "batching",
            VideoState::Upserting => "upserting",
            VideoState::Done => "done",
            VideoState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A video selected for processing. The transcript stays in the playlist.
#[derive(Debug, Clone)]
pub struct VideoTask<'a> {
    pub video_id: String,
    pub title: String,
    pub transcript: &'a Transcript,
}

/// How a single video ended.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoOutcome {
    /// Every batch was stored and the checkpoint updated.
    Done {
        video_id: String,
        vectors: usize,
        batches: usize,
        skipped_parts: usize,
    },
    /// Nothing to embed; left out of the checkpoint so it is looked at again.
    NoEmbeddings {
        video_id: String,
        skipped_parts: usize,
    },
    /// Something went wrong; the video will be retried on the next run.
    Failed {
        video_id: String,
        title: String,
        /// Last state reached before the failure.
        stage: VideoState,
        error: String,
        /// Upsert batches that were rejected.
        failed_batches: usize,
        skipped_parts: usize,
    },
    /// Not started because shutdown was requested.
    Cancelled { video_id: String },
}

/// A video that did not make it.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedVideo {
    pub video_id: String,
    pub title: String,
    pub stage: VideoState,
    pub error: String,
    pub failed_batches: usize,
}

/// Summary of one playlist run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub playlist_id: String,
    /// Videos completed and checkpointed during this run.
    pub processed: Vec<String>,
    /// Playlist entries not entered into the pipeline.
    pub skipped: usize,
    /// Videos without anything to embed.
    pub zero_embedding: Vec<String>,
    pub failed: Vec<FailedVideo>,
    /// Videos never started because of shutdown.
    pub cancelled: usize,
    /// Upsert batches rejected across all videos.
    pub failed_batches: usize,
    /// Vectors written across all videos.
    pub vectors_upserted: usize,
    /// Transcript parts dropped for missing or empty text.
    pub skipped_parts: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    fn new(playlist_id: &str, skipped: usize) -> Self {
        let now = Utc::now();
        Self {
            playlist_id: playlist_id.to_string(),
            processed: Vec::new(),
            skipped,
            zero_embedding: Vec::new(),
            failed: Vec::new(),
            cancelled: 0,
            failed_batches: 0,
            vectors_upserted: 0,
            skipped_parts: 0,
            started_at: now,
            finished_at: now,
        }
    }

    fn absorb(&mut self, outcome: VideoOutcome) {
        match outcome {
            VideoOutcome::Done {
                video_id,
                vectors,
                skipped_parts,
                ..
            } => {
                self.vectors_upserted += vectors;
                self.skipped_parts += skipped_parts;
                self.processed.push(video_id);
            }
            VideoOutcome::NoEmbeddings {
                video_id,
                skipped_parts,
            } => {
                self.skipped_parts += skipped_parts;
                self.zero_embedding.push(video_id);
            }
            VideoOutcome::Failed {
                video_id,
                title,
                stage,
                error,
                failed_batches,
                skipped_parts,
            } => {
                self.failed_batches += failed_batches;
                self.skipped_parts += skipped_parts;
                self.failed.push(FailedVideo {
                    video_id,
                    title,
                    stage,
                    error,
                    failed_batches,
                });
            }
            VideoOutcome::Cancelled { .. } => self.cancelled += 1,
        }
    }

    /// Wall-clock duration of the run.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// The playlist upsert orchestrator.
pub struct Orchestrator {
    embedder: EmbeddingClient,
    vector_store: Arc<dyn VectorStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    chunker: LengthChunker,
    batcher: PayloadBatcher,
    concurrency: usize,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    shutdown: Arc<AtomicBool>,
    progress: Option<ProgressBar>,
}

impl Orchestrator {
    /// Create an orchestrator from its collaborators.
    pub fn new(
        embedder: EmbeddingClient,
        vector_store: Arc<dyn VectorStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        config: PipelineConfig,
    ) -> Result<Self> {
        Ok(Self {
            embedder,
            vector_store,
            checkpoints,
            chunker: LengthChunker::new(config.max_chunk_length)?,
            batcher: PayloadBatcher::new(config.max_payload_bytes, config.bytes_per_number),
            concurrency: config.concurrency.max(1),
            retry: config.retry,
            sleeper: Arc::new(TokioSleeper),
            shutdown: Arc::new(AtomicBool::new(false)),
            progress: None,
        })
    }

    /// Build the production pipeline described by `settings`.
    ///
    /// Fails if required credentials or the index host are missing.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        let provider = OpenAIProvider::from_env(
            &settings.embedding.base_url,
            &settings.embedding.model,
            Duration::from_secs(settings.embedding.timeout_seconds),
        )?;
        let embedder = EmbeddingClient::new(Arc::new(provider), settings.retry.policy())
            .with_sleeper(Arc::new(TokioSleeper))
            .with_timeout(Duration::from_secs(settings.embedding.timeout_seconds))
            .with_dimensions(settings.embedding.dimensions as usize);

        let vector_store = build_vector_store(settings)?;
        let checkpoints = Arc::new(FileCheckpointStore::new(settings.checkpoint_dir()));

        Self::new(
            embedder,
            vector_store,
            checkpoints,
            PipelineConfig::from_settings(settings),
        )
    }

    /// Wait between upsert attempts with `sleeper`.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Report each finished video on a progress bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Flag that stops new videos from being started when set.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Pick the playlist entries that need work.
    ///
    /// Entries without id, title or transcript, duplicates, and videos already
    /// in `completed` are skipped. Returns the tasks and the skip count.
    pub fn select_videos<'a>(
        playlist: &'a PlaylistWithTranscripts,
        completed: &BTreeSet<String>,
    ) -> (Vec<VideoTask<'a>>, usize) {
        let mut tasks = Vec::new();
        let mut seen = HashSet::new();
        let mut skipped = 0;

        for item in &playlist.playlist_items {
            let Some(video_id) = item.video_id() else {
                debug!("Skipping playlist item without video id");
                skipped += 1;
                continue;
            };
            if completed.contains(video_id) {
                debug!("Skipping already processed video: {}", video_id);
                skipped += 1;
                continue;
            }
            let Some(title) = item.title() else {
                debug!("Skipping video {} without title", video_id);
                skipped += 1;
                continue;
            };
            let Some(transcript) = playlist.transcript(video_id) else {
                debug!("Skipping video {} without transcript", video_id);
                skipped += 1;
                continue;
            };
            if !seen.insert(video_id.to_string()) {
                debug!("Skipping duplicate playlist entry for {}", video_id);
                skipped += 1;
                continue;
            }

            tasks.push(VideoTask {
                video_id: video_id.to_string(),
                title: title.to_string(),
                transcript,
            });
        }

        (tasks, skipped)
    }

    /// Index every pending video of a playlist.
    #[instrument(skip(self, playlist), fields(playlist_id = %playlist.playlist_id))]
    pub async fn run(&self, playlist: &PlaylistWithTranscripts) -> Result<RunReport> {
        if playlist.playlist_id.is_empty() {
            return Err(IndexerError::InvalidInput(
                "playlist has no id; cannot checkpoint".to_string(),
            ));
        }
        if !is_valid_playlist_id(&playlist.playlist_id) {
            return Err(IndexerError::InvalidInput(format!(
                "invalid playlist id '{}'",
                playlist.playlist_id
            )));
        }

        let tracker = CheckpointTracker::load(self.checkpoints.clone(), &playlist.playlist_id).await;
        let completed = tracker.snapshot().await;
        let (tasks, skipped) = Self::select_videos(playlist, &completed);
        let mut report = RunReport::new(&playlist.playlist_id, skipped);

        info!(
            "{} video(s) to process, {} skipped, concurrency {}",
            tasks.len(),
            skipped,
            self.concurrency
        );
        if let Some(pb) = &self.progress {
            pb.set_length(tasks.len() as u64);
        }

        let tracker = &tracker;
        let mut outcomes = stream::iter(tasks)
            .map(|task| async move {
                if self.shutdown.load(Ordering::SeqCst) {
                    return VideoOutcome::Cancelled {
                        video_id: task.video_id,
                    };
                }
                self.process_contained(task, tracker).await
            })
            .buffer_unordered(self.concurrency);

        while let Some(outcome) = outcomes.next().await {
            if let Some(pb) = &self.progress {
                pb.inc(1);
            }
            report.absorb(outcome);
        }

        report.finished_at = Utc::now();
        info!(
            "Playlist {} finished: {} processed, {} failed ({} batch(es)), {} without embeddings, {} skipped, {} cancelled, {} part(s) without text",
            report.playlist_id,
            report.processed.len(),
            report.failed.len(),
            report.failed_batches,
            report.zero_embedding.len(),
            report.skipped,
            report.cancelled,
            report.skipped_parts
        );
        Ok(report)
    }

    /// Run one video, turning errors and panics into a `Failed` outcome.
    async fn process_contained(
        &self,
        task: VideoTask<'_>,
        tracker: &CheckpointTracker,
    ) -> VideoOutcome {
        let video_id = task.video_id.clone();
        let title = task.title.clone();

        match AssertUnwindSafe(self.process_video(task, tracker))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Pipeline panicked for video {} ({})", video_id, title);
                VideoOutcome::Failed {
                    video_id,
                    title,
                    stage: VideoState::Failed,
                    error: "pipeline panicked".to_string(),
                    failed_batches: 0,
                    skipped_parts: 0,
                }
            }
        }
    }

    #[instrument(skip_all, fields(video_id = %task.video_id))]
    async fn process_video(
        &self,
        task: VideoTask<'_>,
        tracker: &CheckpointTracker,
    ) -> VideoOutcome {
        let mut state = VideoState::Pending;
        info!("Processing video: {} {}", task.video_id, task.title);

        let outcome = self.chunker.split(task.transcript);
        let (chunks, skipped_parts) = (outcome.chunks, outcome.skipped_parts);

        let fail = |stage: VideoState, error: String, failed_batches: usize| {
            warn!(
                "Error upserting transcripts for video {} ({}) while {}: {}",
                task.video_id, task.title, stage, error
            );
            VideoOutcome::Failed {
                video_id: task.video_id.clone(),
                title: task.title.clone(),
                stage,
                error,
                failed_batches,
                skipped_parts,
            }
        };

        if chunks.is_empty() {
            warn!(
                "Video {} ({}) has no text to embed; leaving it out of the checkpoint",
                task.video_id, task.title
            );
            return VideoOutcome::NoEmbeddings {
                video_id: task.video_id,
                skipped_parts,
            };
        }

        transition(&mut state, VideoState::Embedding, &task.video_id);
        let embeddings = match self.embedder.embed_chunks(&chunks).await {
            Ok(embeddings) => embeddings,
            Err(e) => return fail(state, e.to_string(), 0),
        };

        transition(&mut state, VideoState::Batching, &task.video_id);
        let records = build_records(&task, &chunks, embeddings);
        if records.is_empty() {
            warn!("Video {} produced no vectors", task.video_id);
            return VideoOutcome::NoEmbeddings {
                video_id: task.video_id,
                skipped_parts,
            };
        }
        let vector_count = records.len();
        let batches = self.batcher.batch(records);
        info!(
            "Upserting {} vectors for video {} in {} batch(es)",
            vector_count,
            task.video_id,
            batches.len()
        );

        transition(&mut state, VideoState::Upserting, &task.video_id);
        let mut failed_batches = 0;
        for (n, batch) in batches.iter().enumerate() {
            let stored = upsert_with_retry(
                self.vector_store.as_ref(),
                &batch.records,
                &self.retry,
                self.sleeper.as_ref(),
            )
            .await;
            match stored {
                Ok(count) => debug!(
                    "Upserted batch {} of {} vectors (~{} bytes)",
                    n, count, batch.estimated_bytes
                ),
                Err(e) => {
                    error!("Error upserting batch {} for video {}: {}", n, task.video_id, e);
                    failed_batches += 1;
                }
            }
        }

        if failed_batches > 0 {
            return fail(
                state,
                format!("{} of {} batch(es) failed to upsert", failed_batches, batches.len()),
                failed_batches,
            );
        }

        if let Err(e) = tracker.record(&task.video_id).await {
            return fail(state, e.to_string(), 0);
        }

        transition(&mut state, VideoState::Done, &task.video_id);
        VideoOutcome::Done {
            video_id: task.video_id,
            vectors: vector_count,
            batches: batches.len(),
            skipped_parts,
        }
    }
}

fn transition(state: &mut VideoState, next: VideoState, video_id: &str) {
    debug!("Video {}: {} -> {}", video_id, state, next);
    *state = next;
}

/// Attach ids and metadata to every vector, in chunk order.
fn build_records(
    task: &VideoTask,
    chunks: &[TranscriptChunk],
    embeddings: Vec<ChunkEmbedding>,
) -> Vec<UpsertRecord> {
    let mut records = Vec::new();

    for (chunk, embedding) in chunks.iter().zip(embeddings) {
        let text = chunk.text();
        for (i, values) in embedding.vectors.into_iter().enumerate() {
            records.push(UpsertRecord {
                id: UpsertRecord::record_id(&task.video_id, chunk.index, i),
                values,
                metadata: Some(RecordMetadata {
                    video_id: task.video_id.clone(),
                    title: task.title.clone(),
                    part_index: chunk.index,
                    transcript_part: text.clone(),
                    start: chunk.start_seconds(),
                }),
            });
        }
    }

    records
}

/// Vector store selected by the settings.
pub fn build_vector_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    let timeout = Duration::from_secs(settings.vector_store.timeout_seconds);
    match settings.vector_store.provider {
        VectorStoreProvider::Pinecone => {
            let host = settings.vector_store.index_host.as_deref().ok_or_else(|| {
                IndexerError::Config(
                    "Pinecone index host not configured (set PINECONE_INDEX_HOST)".to_string(),
                )
            })?;
            Ok(Arc::new(PineconeStore::from_env(
                host,
                settings.vector_store.namespace.clone(),
                timeout,
            )?))
        }
        VectorStoreProvider::Memory => Ok(Arc::new(MemoryVectorStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingProvider, ProviderError};
    use crate::retry::testing::RecordingSleeper;
    use crate::transcript::{PlaylistItem, TranscriptPart};
    use crate::vector_store::StoredVector;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Deterministic provider: the vector is derived from the text.
    #[derive(Default)]
    struct FakeProvider {
        texts: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl EmbeddingProvider for FakeProvider {
        async fn embed(&self, text: &str) -> std::result::Result<Vec<Vec<f64>>, ProviderError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.texts.lock().unwrap().push(text.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if text.contains("boom") {
                return Err(ProviderError::Fatal("400 bad request".to_string()));
            }
            let first = text.chars().next().map(|c| c as u32 as f64).unwrap_or(0.0);
            Ok(vec![vec![text.chars().count() as f64, first]])
        }
    }

    /// Memory store that rejects any batch containing one of `fail_ids`.
    struct FlakyStore {
        inner: MemoryVectorStore,
        fail_ids: Vec<String>,
    }

    #[async_trait]
    impl VectorStore for FlakyStore {
        async fn upsert(&self, records: &[UpsertRecord]) -> Result<usize> {
            if records.iter().any(|r| self.fail_ids.contains(&r.id)) {
                return Err(IndexerError::VectorStore("payload rejected".to_string()));
            }
            self.inner.upsert(records).await
        }

        async fn fetch(&self, ids: &[String]) -> Result<HashMap<String, StoredVector>> {
            self.inner.fetch(ids).await
        }
    }

    /// Memory store whose first `outages` upserts report the store as unavailable.
    struct OutageStore {
        inner: MemoryVectorStore,
        outages: AtomicUsize,
    }

    #[async_trait]
    impl VectorStore for OutageStore {
        async fn upsert(&self, records: &[UpsertRecord]) -> Result<usize> {
            let remaining = self.outages.load(Ordering::SeqCst);
            if remaining > 0 {
                self.outages.store(remaining - 1, Ordering::SeqCst);
                return Err(IndexerError::StoreUnavailable(
                    "upsert request failed: operation timed out".to_string(),
                ));
            }
            self.inner.upsert(records).await
        }

        async fn fetch(&self, ids: &[String]) -> Result<HashMap<String, StoredVector>> {
            self.inner.fetch(ids).await
        }
    }

    struct Harness {
        provider: Arc<FakeProvider>,
        store: Arc<MemoryVectorStore>,
        checkpoints: Arc<FileCheckpointStore>,
        sleeper: Arc<RecordingSleeper>,
        _dir: tempfile::TempDir,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_provider(FakeProvider::default())
        }

        fn with_provider(provider: FakeProvider) -> Self {
            let dir = tempfile::tempdir().unwrap();
            Self {
                provider: Arc::new(provider),
                store: Arc::new(MemoryVectorStore::new()),
                checkpoints: Arc::new(FileCheckpointStore::new(dir.path())),
                sleeper: Arc::new(RecordingSleeper::default()),
                _dir: dir,
            }
        }

        fn orchestrator(&self, config: PipelineConfig) -> Orchestrator {
            self.orchestrator_with_store(self.store.clone(), config)
        }

        fn orchestrator_with_store(
            &self,
            store: Arc<dyn VectorStore>,
            config: PipelineConfig,
        ) -> Orchestrator {
            let embedder = EmbeddingClient::new(
                self.provider.clone(),
                RetryPolicy::new(1, Duration::from_millis(0), 2.0),
            );
            Orchestrator::new(embedder, store, self.checkpoints.clone(), config)
                .unwrap()
                .with_sleeper(self.sleeper.clone())
        }

        fn embedded_texts(&self) -> Vec<String> {
            self.provider.texts.lock().unwrap().clone()
        }
    }

    fn playlist(videos: &[(&str, Vec<&str>)]) -> PlaylistWithTranscripts {
        let mut playlist = PlaylistWithTranscripts {
            playlist_id: "PL".to_string(),
            ..Default::default()
        };
        for (id, texts) in videos {
            playlist
                .playlist_items
                .push(PlaylistItem::new(*id, format!("Title {}", id)));
            let parts = texts
                .iter()
                .enumerate()
                .map(|(i, t)| TranscriptPart::new(*t, i as f64 * 5.0, 5.0))
                .collect();
            playlist
                .transcripts
                .insert(id.to_string(), Transcript::new(*id, parts));
        }
        playlist
    }

    fn ids(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_two_chunk_video_yields_deterministic_ids() {
        let harness = Harness::new();
        let a = "a".repeat(500);
        let b = "b".repeat(600);
        let playlist = playlist(&[("v1", vec![a.as_str(), b.as_str()])]);

        let report = harness
            .orchestrator(PipelineConfig::default())
            .run(&playlist)
            .await
            .unwrap();

        assert_eq!(report.processed, vec!["v1".to_string()]);
        assert_eq!(report.vectors_upserted, 2);
        let snapshot = harness.store.snapshot();
        let stored: Vec<&String> = snapshot.keys().collect();
        assert_eq!(stored, vec!["v1-0-0", "v1-1-0"]);

        let meta = snapshot["v1-1-0"].metadata.as_ref().unwrap();
        assert_eq!(meta.part_index, 1);
        assert_eq!(meta.transcript_part, b);
        assert_eq!(meta.start, 5.0);
        assert_eq!(meta.title, "Title v1");

        assert_eq!(harness.checkpoints.load("PL").await, ids(&["v1"]));
    }

    #[tokio::test]
    async fn test_resumes_from_checkpoint() {
        let harness = Harness::new();
        harness
            .checkpoints
            .save("PL", &ids(&["A", "B"]))
            .await
            .unwrap();
        let playlist = playlist(&[
            ("A", vec!["alpha"]),
            ("B", vec!["bravo"]),
            ("C", vec!["charlie"]),
        ]);

        let report = harness
            .orchestrator(PipelineConfig::default())
            .run(&playlist)
            .await
            .unwrap();

        assert_eq!(report.processed, vec!["C".to_string()]);
        assert_eq!(report.skipped, 2);
        assert_eq!(harness.embedded_texts(), vec!["charlie".to_string()]);
        assert_eq!(harness.checkpoints.load("PL").await, ids(&["A", "B", "C"]));
    }

    #[tokio::test]
    async fn test_rerun_produces_identical_store() {
        let playlist = playlist(&[
            ("x", vec!["one", "two", "three"]),
            ("y", vec!["four"]),
        ]);
        let config = PipelineConfig {
            max_chunk_length: 6,
            ..Default::default()
        };

        let first = Harness::new();
        first.orchestrator(config.clone()).run(&playlist).await.unwrap();
        let second = Harness::new();
        second.orchestrator(config).run(&playlist).await.unwrap();

        assert!(!first.store.is_empty());
        assert_eq!(first.store.snapshot(), second.store.snapshot());
    }

    #[tokio::test]
    async fn test_incomplete_entries_are_skipped() {
        let harness = Harness::new();
        let mut playlist = playlist(&[("ok", vec!["text"])]);
        playlist.playlist_items.push(PlaylistItem::default());
        playlist
            .playlist_items
            .push(PlaylistItem::new("untitled", ""));
        playlist
            .playlist_items
            .push(PlaylistItem::new("no-transcript", "Has title"));
        playlist.playlist_items.push(PlaylistItem::new("ok", "Again"));

        let report = harness
            .orchestrator(PipelineConfig::default())
            .run(&playlist)
            .await
            .unwrap();

        assert_eq!(report.processed, vec!["ok".to_string()]);
        assert_eq!(report.skipped, 4);
    }

    #[tokio::test]
    async fn test_failed_video_does_not_stop_others() {
        let harness = Harness::new();
        let playlist = playlist(&[
            ("good1", vec!["fine"]),
            ("bad", vec!["boom"]),
            ("good2", vec!["also fine"]),
        ]);

        let report = harness
            .orchestrator(PipelineConfig {
                concurrency: 2,
                ..Default::default()
            })
            .run(&playlist)
            .await
            .unwrap();

        assert_eq!(report.processed.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].video_id, "bad");
        assert_eq!(report.failed[0].stage, VideoState::Embedding);
        assert_eq!(
            harness.checkpoints.load("PL").await,
            ids(&["good1", "good2"])
        );
    }

    #[tokio::test]
    async fn test_failed_batch_continues_but_skips_checkpoint() {
        let harness = Harness::new();
        let flaky = Arc::new(FlakyStore {
            inner: MemoryVectorStore::new(),
            fail_ids: vec!["v-1-0".to_string()],
        });
        let playlist = playlist(&[("v", vec!["aaaa", "bbbb", "cccc"])]);
        let config = PipelineConfig {
            max_chunk_length: 4,
            max_payload_bytes: 1,
            ..Default::default()
        };

        let report = harness
            .orchestrator_with_store(flaky.clone(), config)
            .run(&playlist)
            .await
            .unwrap();

        assert!(report.processed.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].stage, VideoState::Upserting);
        assert_eq!(report.failed_batches, 1);
        let stored: Vec<String> = flaky.inner.snapshot().into_keys().collect();
        assert_eq!(stored, vec!["v-0-0".to_string(), "v-2-0".to_string()]);
        assert!(harness.checkpoints.load("PL").await.is_empty());
    }

    #[tokio::test]
    async fn test_video_without_text_is_not_checkpointed() {
        let harness = Harness::new();
        let playlist = playlist(&[("silent", vec!["", ""]), ("empty", vec![])]);

        let report = harness
            .orchestrator(PipelineConfig::default())
            .run(&playlist)
            .await
            .unwrap();

        assert_eq!(report.zero_embedding.len(), 2);
        assert_eq!(report.skipped_parts, 2);
        assert!(report.processed.is_empty());
        assert!(harness.embedded_texts().is_empty());
        assert!(harness.checkpoints.load("PL").await.is_empty());
    }

    #[tokio::test]
    async fn test_skipped_parts_are_counted_for_indexed_video() {
        let harness = Harness::new();
        let playlist = playlist(&[("mixed", vec!["hello", "", " ", "world"])]);

        let report = harness
            .orchestrator(PipelineConfig::default())
            .run(&playlist)
            .await
            .unwrap();

        assert_eq!(report.processed, vec!["mixed".to_string()]);
        assert_eq!(report.skipped_parts, 1);
        assert_eq!(harness.embedded_texts(), vec!["hello   world".to_string()]);
    }

    #[tokio::test]
    async fn test_unavailable_store_is_retried_and_video_checkpointed() {
        let harness = Harness::new();
        let store = Arc::new(OutageStore {
            inner: MemoryVectorStore::new(),
            outages: AtomicUsize::new(1),
        });
        let config = PipelineConfig {
            retry: RetryPolicy::new(3, Duration::from_millis(10), 2.0),
            ..Default::default()
        };

        let report = harness
            .orchestrator_with_store(store.clone(), config)
            .run(&playlist(&[("v", vec!["words"])]))
            .await
            .unwrap();

        assert_eq!(report.processed, vec!["v".to_string()]);
        assert_eq!(report.failed_batches, 0);
        assert_eq!(harness.sleeper.recorded(), vec![Duration::from_millis(10)]);
        assert_eq!(store.inner.snapshot().len(), 1);
        assert_eq!(harness.checkpoints.load("PL").await, ids(&["v"]));
    }

    #[test]
    fn test_tasks_borrow_transcripts_from_playlist() {
        let playlist = playlist(&[("a", vec!["x"]), ("b", vec!["y"])]);

        let (tasks, skipped) = Orchestrator::select_videos(&playlist, &ids(&["b"]));

        assert_eq!(skipped, 1);
        assert_eq!(tasks.len(), 1);
        let original = playlist.transcript("a").unwrap();
        assert!(std::ptr::eq(tasks[0].transcript, original));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let harness = Harness::with_provider(FakeProvider {
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        });
        let names: Vec<String> = (0..8).map(|i| format!("v{}", i)).collect();
        let videos: Vec<(&str, Vec<&str>)> =
            names.iter().map(|n| (n.as_str(), vec!["words"])).collect();
        let playlist = playlist(&videos);

        let report = harness
            .orchestrator(PipelineConfig {
                concurrency: 3,
                ..Default::default()
            })
            .run(&playlist)
            .await
            .unwrap();

        assert_eq!(report.processed.len(), 8);
        let peak = harness.provider.max_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight was {}", peak);
        assert_eq!(harness.checkpoints.load("PL").await.len(), 8);
    }

    #[tokio::test]
    async fn test_shutdown_prevents_new_videos() {
        let harness = Harness::new();
        let orchestrator = harness.orchestrator(PipelineConfig::default());
        orchestrator.shutdown_handle().store(true, Ordering::SeqCst);

        let report = orchestrator
            .run(&playlist(&[("a", vec!["x"]), ("b", vec!["y"])]))
            .await
            .unwrap();

        assert_eq!(report.cancelled, 2);
        assert!(report.processed.is_empty());
        assert!(harness.embedded_texts().is_empty());
    }

    #[tokio::test]
    async fn test_playlist_without_id_is_rejected() {
        let harness = Harness::new();
        let mut playlist = playlist(&[("a", vec!["x"])]);
        playlist.playlist_id = String::new();

        let result = harness
            .orchestrator(PipelineConfig::default())
            .run(&playlist)
            .await;
        assert!(matches!(result, Err(IndexerError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_playlist_id_with_path_separators_is_rejected() {
        let harness = Harness::new();
        let mut playlist = playlist(&[("a", vec!["x"])]);
        playlist.playlist_id = "../x".to_string();

        let result = harness
            .orchestrator(PipelineConfig::default())
            .run(&playlist)
            .await;

        assert!(matches!(result, Err(IndexerError::InvalidInput(_))));
        assert!(harness.embedded_texts().is_empty());
    }
}
