//! Single-file ingestion run
//!
//! A worker owns one peer file for one run: open it, stream records through
//! the novelty filter into storage with pacing in between, then delete the
//! file. Once the open succeeds the file is removed on every exit path.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::decoder::{RecordDecoder, DEFAULT_MAX_FRAME_LENGTH};
use crate::error::{IngestError, Result};
use crate::novelty::NoveltyFilter;
use crate::pacing::{IntervalPacer, Pacer};
use crate::storage::StorageSink;

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Opening,
    Streaming,
    Completed,
    Aborted,
    FailedToOpen,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Opening => "opening",
            WorkerState::Streaming => "streaming",
            WorkerState::Completed => "completed",
            WorkerState::Aborted => "aborted",
            WorkerState::FailedToOpen => "failed_to_open",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// Stream ended cleanly at a frame boundary
    Completed,
    /// Decode or storage failure mid-stream; the file was still cleaned up
    Aborted(IngestError),
    /// The file could not be opened and was left alone
    FailedToOpen(IngestError),
}

impl RunOutcome {
    pub fn state(&self) -> WorkerState {
        match self {
            RunOutcome::Completed => WorkerState::Completed,
            RunOutcome::Aborted(_) => WorkerState::Aborted,
            RunOutcome::FailedToOpen(_) => WorkerState::FailedToOpen,
        }
    }

    pub fn error(&self) -> Option<&IngestError> {
        match self {
            RunOutcome::Completed => None,
            RunOutcome::Aborted(err) | RunOutcome::FailedToOpen(err) => Some(err),
        }
    }
}

/// What a run did, for logs and tests
#[derive(Debug)]
pub struct IngestionReport {
    pub run_id: Uuid,
    pub outcome: RunOutcome,
    pub inserted: u64,
    pub skipped: u64,
}

impl IngestionReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            outcome: RunOutcome::Completed,
            inserted: 0,
            skipped: 0,
        }
    }

    /// Records pulled from the file
    pub fn processed(&self) -> u64 {
        self.inserted + self.skipped
    }

    pub fn state(&self) -> WorkerState {
        self.outcome.state()
    }
}

/// Ingests one peer file into a [`StorageSink`]
pub struct IngestionWorker {
    store: Arc<dyn StorageSink>,
    pacer: Arc<dyn Pacer>,
    path: PathBuf,
    max_frame_length: usize,
}

impl IngestionWorker {
    /// Worker with the default pacing interval and frame limit
    pub fn new(store: Arc<dyn StorageSink>, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(IngestError::configuration("source path cannot be empty"));
        }

        Ok(Self {
            store,
            pacer: Arc::new(IntervalPacer::default()),
            path,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        })
    }

    pub fn from_config(
        store: Arc<dyn StorageSink>,
        path: impl Into<PathBuf>,
        config: &IngestConfig,
    ) -> Result<Self> {
        config.validate()?;
        let mut worker = Self::new(store, path)?;
        worker.pacer = Arc::new(IntervalPacer::new(config.pace_interval()));
        worker.max_frame_length = config.max_frame_length;
        Ok(worker)
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    /// Run to completion. Failures end up in the report, never in a panic or
    /// an `Err`.
    pub async fn run(&self) -> IngestionReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("ingest", %run_id, path = %self.path.display());
        self.execute(run_id).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid) -> IngestionReport {
        let mut report = IngestionReport::new(run_id);
        debug!(state = %WorkerState::Opening, "Worker state");

        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(source) => {
                let err = IngestError::OpenFailure {
                    path: self.path.clone(),
                    source,
                };
                error!(error = %err, "Failed to open source file");
                report.outcome = RunOutcome::FailedToOpen(err);
                debug!(state = %WorkerState::FailedToOpen, "Worker state");
                return report;
            },
        };

        let cleanup = SourceCleanup::arm(&self.path);
        info!("Opened source file");
        debug!(state = %WorkerState::Streaming, "Worker state");

        match self.stream(file, &mut report).await {
            Ok(()) => {
                info!(
                    inserted = report.inserted,
                    skipped = report.skipped,
                    "Ingestion completed"
                );
            },
            Err(err) => {
                match &err {
                    IngestError::Decode(decode) => error!(
                        error = %decode,
                        offset = decode.offset(),
                        inserted = report.inserted,
                        skipped = report.skipped,
                        "Source file is corrupt, aborting run"
                    ),
                    other => error!(
                        error = %other,
                        inserted = report.inserted,
                        skipped = report.skipped,
                        "Storage failure, aborting run"
                    ),
                }
                report.outcome = RunOutcome::Aborted(err);
            },
        }
        debug!(state = %report.state(), "Worker state");

        cleanup.remove().await;
        report
    }

    /// Pull records until the end of the stream or the first failure. The
    /// decoder, and with it the file handle, is dropped on return.
    async fn stream(&self, file: File, report: &mut IngestionReport) -> Result<()> {
        let mut decoder = RecordDecoder::with_max_frame_length(file, self.max_frame_length);
        let mut filter = NoveltyFilter::new();

        while let Some(record) = decoder.next_record().await? {
            let novel = filter
                .is_novel(self.store.as_ref(), &record.source_id, record.timestamp)
                .await?;

            if novel {
                let id = self.store.insert(&record).await?;
                report.inserted += 1;
                debug!(
                    id,
                    source_id = %record.source_id,
                    timestamp = record.timestamp,
                    "Inserted record"
                );
            } else {
                report.skipped += 1;
                debug!(
                    source_id = %record.source_id,
                    timestamp = record.timestamp,
                    threshold = filter.threshold(),
                    "Skipped record that is not newer than stored data"
                );
                self.pacer.pace().await;
            }

            self.pacer.pace().await;
        }

        Ok(())
    }
}

/// Deletes the source file exactly once after a successful open.
///
/// [`SourceCleanup::remove`] is the normal path; dropping an armed guard
/// (the run future was cancelled or panicked) falls back to a blocking delete.
struct SourceCleanup<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> SourceCleanup<'a> {
    fn arm(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    async fn remove(mut self) {
        self.armed = false;
        match tokio::fs::remove_file(self.path).await {
            Ok(()) => debug!("Deleted source file"),
            Err(err) => warn!(error = %err, "Cleanup failed, source file was not deleted"),
        }
    }
}

impl Drop for SourceCleanup<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = std::fs::remove_file(self.path) {
            warn!(error = %err, "Cleanup failed, source file was not deleted");
        }
    }
}
