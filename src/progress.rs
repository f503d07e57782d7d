//! Progress reporting seam shared by the harvester and the orchestrator.
//!
//! The library only emits events; rendering (spinners, bars) lives in the
//! binary. Every method has a no-op default.

use crate::store::{DownloadStatus, YearMonth};

/// Per-record completion event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemProgress<'a> {
    /// Namespace (account login) of the record.
    pub account: &'a str,
    /// Clip id.
    pub clip_id: &'a str,
    /// Final status of this attempt.
    pub status: DownloadStatus,
    /// Platform creation timestamp of the clip.
    pub created_at: &'a str,
}

/// Receives progress events. Implementations must be cheap and non-blocking.
pub trait ProgressReporter: Send + Sync {
    /// A download run is starting with `total` records.
    fn begin(&self, _total: usize) {}

    /// The harvester moved to a new month window.
    fn window_started(&self, _window: YearMonth) {}

    /// The harvester stored a page of `count` clips.
    fn clips_harvested(&self, _count: usize) {}

    /// One download record reached its final status for this run.
    fn item_finished(&self, _item: &ItemProgress<'_>) {}

    /// The current phase finished.
    fn finish(&self) {}
}

/// Reporter that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {}
