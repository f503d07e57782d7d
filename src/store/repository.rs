//! Repository seam for clip persistence.
//!
//! The harvester and the download orchestrator depend on this trait rather
//! than on [`ClipStore`] directly, so tests can substitute failing or
//! recording fakes.

use async_trait::async_trait;

use super::{ClipRecord, ClipStore, DownloadStatus, Namespace, NewClip, Result, YearMonth};

/// Data-access contract for clip records.
#[async_trait]
pub trait ClipRepository: Send + Sync {
    /// Inserts or refreshes a page of harvested clips.
    async fn upsert(&self, namespace: &Namespace, clips: &[NewClip]) -> Result<u64>;

    /// Month of the newest stored clip, or the epoch sentinel.
    async fn latest_created_window(&self, namespace: &Namespace) -> YearMonth;

    /// Candidate records for a download run.
    async fn candidate_records(
        &self,
        namespace: &Namespace,
        min_view: i64,
        max_count: i64,
        include_completed: bool,
    ) -> Result<Vec<ClipRecord>>;

    /// Point update of one record's download state.
    async fn record_outcome(
        &self,
        namespace: &Namespace,
        local_id: i64,
        status: DownloadStatus,
        path: &str,
    ) -> Result<()>;
}

#[async_trait]
impl ClipRepository for ClipStore {
    async fn upsert(&self, namespace: &Namespace, clips: &[NewClip]) -> Result<u64> {
        ClipStore::upsert(self, namespace, clips).await
    }

    async fn latest_created_window(&self, namespace: &Namespace) -> YearMonth {
        ClipStore::latest_created_window(self, namespace).await
    }

    async fn candidate_records(
        &self,
        namespace: &Namespace,
        min_view: i64,
        max_count: i64,
        include_completed: bool,
    ) -> Result<Vec<ClipRecord>> {
        ClipStore::candidate_records(self, namespace, min_view, max_count, include_completed).await
    }

    async fn record_outcome(
        &self,
        namespace: &Namespace,
        local_id: i64,
        status: DownloadStatus,
        path: &str,
    ) -> Result<()> {
        ClipStore::record_outcome(self, namespace, local_id, status, path).await
    }
}
