//! Harvester: walks monthly windows of an account's clips and stores them.
//!
//! Windows run strictly in order, one page request at a time. Each page is
//! upserted as soon as it arrives, so an interrupt or a later failure never
//! discards pages already fetched.

mod enrich;
mod window;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub use enrich::{derive_asset_url, enrich};
pub use window::{HarvestPlan, MonthWindow, WINDOW_OVERLAP_MINUTES};

use crate::api::{ApiError, ClipPage, ClipQuery, ClipSource};
use crate::download::{AttemptOutcome, RetryPolicy};
use crate::progress::ProgressReporter;
use crate::store::{ClipRepository, Namespace, NewClip, StoreError};

/// Attempts per page before the rest of the window is abandoned.
pub const PAGE_MAX_ATTEMPTS: u32 = 3;

/// Default page size requested from the listing endpoint.
pub const DEFAULT_PAGE_SIZE: u32 = 40;

/// How often a running window checks the interrupt flag.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

/// Fatal harvest failures.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Persisting a fetched page failed.
    #[error("failed to store harvested clips: {0}")]
    Store(#[from] StoreError),
}

/// Why a single window stopped early.
#[derive(Debug)]
enum WindowError {
    Fetch { error: ApiError, attempts: u32 },
    Store(StoreError),
}

/// Counters from one harvest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestStats {
    windows: usize,
    pages: usize,
    clips: usize,
    failed_windows: usize,
    interrupted: bool,
}

impl HarvestStats {
    /// Windows started.
    #[must_use]
    pub fn windows(&self) -> usize {
        self.windows
    }

    /// Pages fetched and stored.
    #[must_use]
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Clips stored, counting repeats across overlapping windows.
    #[must_use]
    pub fn clips(&self) -> usize {
        self.clips
    }

    /// Windows abandoned after a page ran out of attempts.
    #[must_use]
    pub fn failed_windows(&self) -> usize {
        self.failed_windows
    }

    #[must_use]
    pub fn was_interrupted(&self) -> bool {
        self.interrupted
    }
}

/// Sequential month-by-month clip harvester.
#[derive(Clone)]
pub struct Harvester {
    source: Arc<dyn ClipSource>,
    repository: Arc<dyn ClipRepository>,
    broadcaster_id: String,
    page_size: u32,
    page_retry: RetryPolicy,
    progress: Arc<dyn ProgressReporter>,
}

impl std::fmt::Debug for Harvester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harvester")
            .field("broadcaster_id", &self.broadcaster_id)
            .field("page_size", &self.page_size)
            .field("page_retry", &self.page_retry)
            .finish_non_exhaustive()
    }
}

impl Harvester {
    #[must_use]
    pub fn new(
        source: Arc<dyn ClipSource>,
        repository: Arc<dyn ClipRepository>,
        broadcaster_id: impl Into<String>,
        page_size: u32,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            source,
            repository,
            broadcaster_id: broadcaster_id.into(),
            page_size: page_size.max(1),
            page_retry: RetryPolicy::immediate(PAGE_MAX_ATTEMPTS),
            progress,
        }
    }

    /// Overrides the per-page retry policy.
    #[must_use]
    pub fn with_page_retry(mut self, policy: RetryPolicy) -> Self {
        self.page_retry = policy;
        self
    }

    /// Walks every window of `plan` and upserts what it finds.
    ///
    /// A page that exhausts its attempts abandons the rest of its window and
    /// the walk moves on. An interrupt abandons the current window at once and
    /// returns normally with [`HarvestStats::was_interrupted`] set.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Store`] if a fetched page cannot be stored.
    #[instrument(skip(self, plan, interrupted), fields(namespace = %namespace, from = %plan.start(), until = %plan.until()))]
    pub async fn run(
        &self,
        namespace: &Namespace,
        plan: &HarvestPlan,
        interrupted: Arc<AtomicBool>,
    ) -> Result<HarvestStats, HarvestError> {
        let mut stats = HarvestStats::default();
        info!(broadcaster_id = %self.broadcaster_id, "Starting harvest");

        for window in plan.windows() {
            if interrupted.load(Ordering::SeqCst) {
                stats.interrupted = true;
                break;
            }
            stats.windows += 1;
            self.progress.window_started(window.month());
            debug!(window = %window.month(), start = %window.start(), end = %window.end(), "Window started");

            let outcome = tokio::select! {
                biased;
                () = wait_for_interrupt(&interrupted) => None,
                result = self.drain_window(namespace, &window, &mut stats) => Some(result),
            };

            match outcome {
                None => {
                    warn!(window = %window.month(), "Harvest interrupted; window abandoned");
                    stats.interrupted = true;
                    break;
                }
                Some(Ok(())) => {}
                Some(Err(WindowError::Fetch { error, attempts })) => {
                    warn!(
                        window = %window.month(),
                        start = %window.start(),
                        end = %window.end(),
                        attempts,
                        error = %error,
                        "Page fetch failed; skipping rest of window"
                    );
                    stats.failed_windows += 1;
                }
                Some(Err(WindowError::Store(e))) => {
                    self.progress.finish();
                    return Err(HarvestError::Store(e));
                }
            }
        }

        self.progress.finish();
        info!(
            windows = stats.windows,
            pages = stats.pages,
            clips = stats.clips,
            failed_windows = stats.failed_windows,
            interrupted = stats.interrupted,
            "Harvest complete"
        );
        Ok(stats)
    }

    async fn drain_window(
        &self,
        namespace: &Namespace,
        window: &MonthWindow,
        stats: &mut HarvestStats,
    ) -> Result<(), WindowError> {
        let first = ClipQuery::window(
            self.broadcaster_id.clone(),
            self.page_size,
            window.start(),
            window.end(),
        );
        let mut query = first.clone();

        loop {
            let page = self.fetch_page(&query).await?;
            let cursor = page.cursor.clone();

            let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
            let records: Vec<NewClip> = page
                .clips
                .into_iter()
                .map(|clip| enrich(clip, &stamp))
                .collect();
            self.repository
                .upsert(namespace, &records)
                .await
                .map_err(WindowError::Store)?;

            stats.pages += 1;
            stats.clips += records.len();
            self.progress.clips_harvested(records.len());
            debug!(window = %window.month(), clips = records.len(), "Page stored");

            match cursor {
                Some(cursor) => query = first.after(cursor),
                None => return Ok(()),
            }
        }
    }

    async fn fetch_page(&self, query: &ClipQuery) -> Result<ClipPage, WindowError> {
        self.page_retry
            .run(move |attempt| async move {
                match self.source.list_clips(query).await {
                    Ok(page) => AttemptOutcome::Success(page),
                    Err(error) => {
                        debug!(attempt, error = %error, "Page fetch attempt failed");
                        if error.is_transient() {
                            AttemptOutcome::Transient(error)
                        } else {
                            AttemptOutcome::Fatal(error)
                        }
                    }
                }
            })
            .await
            .map(|(page, _attempts)| page)
            .map_err(|(error, attempts)| WindowError::Fetch { error, attempts })
    }
}

/// Resolves once `flag` is set.
async fn wait_for_interrupt(flag: &AtomicBool) {
    while !flag.load(Ordering::SeqCst) {
        tokio::time::sleep(INTERRUPT_POLL).await;
    }
}
