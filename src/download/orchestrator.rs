//! Concurrent download of stored clips with status write-back.
//!
//! # Concurrency Model
//!
//! - Candidates are read once into an immutable snapshot
//! - A fixed number of worker tasks claim snapshot indices through an atomic cursor
//! - Each worker finishes its record before claiming the next one
//! - Workers send a report per record over a channel; the calling task is the
//!   only writer of outcomes to the store
//! - The interrupt flag is checked before every claim, so an interrupt stops
//!   new work while records already claimed run to completion

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::constants::{
    DEFAULT_CONCURRENCY, VIDEO_EXTENSION, WRITE_BACK_MAX_ATTEMPTS, WRITE_BACK_RETRY_DELAY,
};
use super::retry::{AttemptOutcome, RetryPolicy};
use super::strategy::{ClipDownloader, DownloadOutcome, Tier};
use crate::paths::{PathResolver, with_extension};
use crate::progress::{ItemProgress, ProgressReporter};
use crate::sidecar::write_sidecar;
use crate::store::{ClipRecord, ClipRepository, DownloadStatus, Namespace, StoreError};

/// Error type for orchestrator runs.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Reading the candidate snapshot failed.
    #[error("failed to load download candidates: {0}")]
    Store(#[from] StoreError),
}

/// Parameters of one download run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Root directory for archived clips.
    pub target_dir: PathBuf,
    /// Worker pool width; values below 1 are treated as 1.
    pub concurrency: usize,
    /// Write a JSON sidecar after each successful download.
    pub save_sidecar: bool,
    /// Include records that are already downloaded.
    pub force_redownload: bool,
    /// Minimum view count.
    pub min_view: i64,
    /// Cap on candidates; zero or negative means no cap.
    pub max_count: i64,
}

impl DownloadRequest {
    /// A request with default pool width and no filters.
    #[must_use]
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            concurrency: DEFAULT_CONCURRENCY,
            save_sidecar: false,
            force_redownload: false,
            min_view: 0,
            max_count: 0,
        }
    }
}

/// Statistics from a download run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadStats {
    candidates: usize,
    downloaded: usize,
    failed: usize,
    via_stream: usize,
    via_asset: usize,
    write_back_failures: usize,
    interrupted: bool,
}

impl DownloadStats {
    /// Number of records in the snapshot.
    #[must_use]
    pub fn candidates(&self) -> usize {
        self.candidates
    }

    /// Records downloaded by either tier.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.downloaded
    }

    /// Records left incomplete after both tiers.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Records processed (downloaded + failed).
    #[must_use]
    pub fn total(&self) -> usize {
        self.downloaded + self.failed
    }

    /// Downloads produced by the stream resolver.
    #[must_use]
    pub fn via_stream(&self) -> usize {
        self.via_stream
    }

    /// Downloads produced by direct asset retrieval.
    #[must_use]
    pub fn via_asset(&self) -> usize {
        self.via_asset
    }

    /// Outcomes that could not be written back to the store.
    #[must_use]
    pub fn write_back_failures(&self) -> usize {
        self.write_back_failures
    }

    /// Snapshot records never claimed because of an interrupt.
    #[must_use]
    pub fn not_started(&self) -> usize {
        self.candidates.saturating_sub(self.total())
    }

    /// Whether the run stopped early on interrupt.
    #[must_use]
    pub fn was_interrupted(&self) -> bool {
        self.interrupted
    }
}

/// Final state of one record, sent from a worker to the collector.
#[derive(Debug)]
struct WorkerReport {
    record: ClipRecord,
    tier: Option<Tier>,
}

/// Runs download batches over a clip repository.
#[derive(Clone)]
pub struct DownloadOrchestrator {
    repository: Arc<dyn ClipRepository>,
    downloader: Arc<dyn ClipDownloader>,
    resolver: PathResolver,
    progress: Arc<dyn ProgressReporter>,
    write_back_retry: RetryPolicy,
}

impl std::fmt::Debug for DownloadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadOrchestrator")
            .field("resolver", &self.resolver)
            .field("write_back_retry", &self.write_back_retry)
            .finish_non_exhaustive()
    }
}

impl DownloadOrchestrator {
    #[must_use]
    pub fn new(
        repository: Arc<dyn ClipRepository>,
        downloader: Arc<dyn ClipDownloader>,
        resolver: PathResolver,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            repository,
            downloader,
            resolver,
            progress,
            write_back_retry: RetryPolicy::new(
                WRITE_BACK_MAX_ATTEMPTS,
                WRITE_BACK_RETRY_DELAY,
                Duration::ZERO,
            ),
        }
    }

    /// Overrides the retry policy used when the store reports contention
    /// during status write-back.
    #[must_use]
    pub fn with_write_back_retry(mut self, policy: RetryPolicy) -> Self {
        self.write_back_retry = policy;
        self
    }

    /// Downloads every candidate record of `namespace` once.
    ///
    /// Per-record failures never abort the run: they are logged, written
    /// back as [`DownloadStatus::Pending`] and counted. An interrupt stops
    /// new claims and returns normally once in-flight records finish.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Store`] only if the candidate snapshot
    /// cannot be read.
    #[instrument(skip(self, request, interrupted), fields(namespace = %namespace, target = %request.target_dir.display()))]
    pub async fn run(
        &self,
        namespace: &Namespace,
        request: &DownloadRequest,
        interrupted: Arc<AtomicBool>,
    ) -> Result<DownloadStats, OrchestratorError> {
        let snapshot: Arc<[ClipRecord]> = self
            .repository
            .candidate_records(
                namespace,
                request.min_view,
                request.max_count,
                request.force_redownload,
            )
            .await?
            .into();

        let mut stats = DownloadStats {
            candidates: snapshot.len(),
            ..DownloadStats::default()
        };
        self.progress.begin(snapshot.len());

        if snapshot.is_empty() {
            info!("No download candidates");
            self.progress.finish();
            return Ok(stats);
        }

        let width = request.concurrency.max(1).min(snapshot.len());
        info!(
            candidates = snapshot.len(),
            workers = width,
            min_view = request.min_view,
            force = request.force_redownload,
            "Starting downloads"
        );

        let cursor = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel::<WorkerReport>(width);
        let mut handles = Vec::with_capacity(width);

        for worker in 0..width {
            let snapshot = Arc::clone(&snapshot);
            let cursor = Arc::clone(&cursor);
            let interrupted = Arc::clone(&interrupted);
            let tx = tx.clone();
            let downloader = Arc::clone(&self.downloader);
            let resolver = self.resolver;
            let target_dir = request.target_dir.clone();
            let save_sidecar = request.save_sidecar;

            handles.push(tokio::spawn(async move {
                loop {
                    if interrupted.load(Ordering::SeqCst) {
                        debug!(worker, "Interrupt observed; worker stopping");
                        break;
                    }
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(record) = snapshot.get(index) else {
                        break;
                    };
                    let report = process_record(
                        record.clone(),
                        downloader.as_ref(),
                        &resolver,
                        &target_dir,
                        save_sidecar,
                    )
                    .await;
                    if tx.send(report).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(tx);

        while let Some(report) = rx.recv().await {
            self.collect(namespace, &report, &mut stats).await;
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Download worker panicked");
            }
        }

        stats.interrupted = interrupted.load(Ordering::SeqCst) && stats.not_started() > 0;
        self.progress.finish();
        info!(
            downloaded = stats.downloaded,
            failed = stats.failed,
            via_stream = stats.via_stream,
            via_asset = stats.via_asset,
            write_back_failures = stats.write_back_failures,
            not_started = stats.not_started(),
            total = stats.total(),
            "Download run complete"
        );
        Ok(stats)
    }

    async fn collect(&self, namespace: &Namespace, report: &WorkerReport, stats: &mut DownloadStats) {
        let record = &report.record;

        // Best-effort status update - don't abort the batch if it fails
        let written = self
            .write_back_retry
            .run(|attempt| async move {
                match self
                    .repository
                    .record_outcome(
                        namespace,
                        record.local_id,
                        record.download_status,
                        &record.download_path,
                    )
                    .await
                {
                    Ok(()) => AttemptOutcome::Success(()),
                    Err(e) if e.is_contention() => {
                        debug!(clip = %record.id, attempt, error = %e, "Store busy; retrying write-back");
                        AttemptOutcome::Transient(e)
                    }
                    Err(e) => AttemptOutcome::Fatal(e),
                }
            })
            .await;
        if let Err((e, attempts)) = written {
            warn!(clip = %record.id, local_id = record.local_id, attempts, error = %e, "Failed to record download outcome");
            stats.write_back_failures += 1;
        }

        match report.tier {
            Some(Tier::Stream) => {
                stats.downloaded += 1;
                stats.via_stream += 1;
            }
            Some(Tier::Asset) => {
                stats.downloaded += 1;
                stats.via_asset += 1;
            }
            None => stats.failed += 1,
        }

        self.progress.item_finished(&ItemProgress {
            account: namespace.as_str(),
            clip_id: &record.id,
            status: record.download_status,
            created_at: &record.created_at,
        });
    }
}

/// Runs both tiers for one record and returns its final in-memory state.
async fn process_record(
    mut record: ClipRecord,
    downloader: &dyn ClipDownloader,
    resolver: &PathResolver,
    target_dir: &Path,
    save_sidecar: bool,
) -> WorkerReport {
    record.download_status = DownloadStatus::Pending;

    let base = match resolver.resolve(target_dir, &record).await {
        Ok(base) => base,
        Err(e) => {
            warn!(clip = %record.id, error = %e, "Could not resolve output path");
            record.download_path = String::new();
            return WorkerReport { record, tier: None };
        }
    };
    let output = with_extension(&base, VIDEO_EXTENSION);
    record.download_path = output.to_string_lossy().into_owned();

    match downloader.download(&record, &output).await {
        DownloadOutcome::Downloaded { tier, .. } => {
            record.download_status = DownloadStatus::Downloaded;
            if save_sidecar && let Err(e) = write_sidecar(&base, &record).await {
                warn!(clip = %record.id, error = %e, "Failed to write sidecar");
            }
            WorkerReport {
                record,
                tier: Some(tier),
            }
        }
        DownloadOutcome::Exhausted {
            stream_error,
            asset_error,
        } => {
            warn!(
                clip = %record.id,
                url = %record.url,
                stream_error = %stream_error,
                asset_error = %asset_error,
                "Download failed after all tiers"
            );
            WorkerReport { record, tier: None }
        }
    }
}
