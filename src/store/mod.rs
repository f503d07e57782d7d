//! Clip store: durable, namespaced persistence of clip records.
//!
//! # Overview
//!
//! - [`ClipStore`] - `SQLite`-backed store operations
//! - [`ClipRecord`] / [`NewClip`] - stored row and harvested input
//! - [`DownloadStatus`] - per-record download lifecycle
//! - [`Namespace`] - validated account isolation key
//! - [`ClipRepository`] - trait seam used by the harvester and orchestrator
//!
//! All namespaces share one `clips` table; the namespace is a bound column
//! value, so account identifiers never reach SQL text.
//!
//! # Example
//!
//! ```ignore
//! use clip_archiver::store::{ClipStore, Namespace};
//! use clip_archiver::Database;
//! use std::path::Path;
//!
//! let db = Database::new(Path::new("clips.db")).await?;
//! let store = ClipStore::new(db);
//! let ns = Namespace::parse("some_streamer")?;
//! store.ensure_namespace(&ns).await?;
//! let resume_from = store.latest_created_window(&ns).await;
//! ```

mod error;
mod namespace;
mod record;
mod repository;
mod year_month;

pub use error::{DbErrorKind, StoreError};
pub use namespace::{Namespace, NamespaceError};
pub use record::{ClipRecord, DownloadStatus, NewClip, VOD_OFFSET_ABSENT};
pub use repository::ClipRepository;
pub use year_month::YearMonth;

use tracing::{debug, instrument, warn};

use crate::db::Database;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// SQLite `LIMIT` value meaning "no limit".
const NO_LIMIT: i64 = -1;

/// Returns `Ok(())` if at least one row was affected; otherwise [`StoreError::RecordNotFound`].
fn check_affected(namespace: &Namespace, local_id: i64, rows_affected: u64) -> Result<()> {
    if rows_affected == 0 {
        Err(StoreError::RecordNotFound {
            namespace: namespace.to_string(),
            local_id,
        })
    } else {
        Ok(())
    }
}

/// Clip store backed by the shared database pool.
#[derive(Debug, Clone)]
pub struct ClipStore {
    db: Database,
}

impl ClipStore {
    /// Creates a store over an opened database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Registers the namespace. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the insert fails.
    #[instrument(skip(self), fields(namespace = %namespace))]
    pub async fn ensure_namespace(&self, namespace: &Namespace) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO namespaces (key) VALUES (?)")
            .bind(namespace.as_str())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Inserts new clips and refreshes known ones, one transaction per call.
    ///
    /// A clip already present in the namespace only gets `view_count` and
    /// `updated_at` refreshed; its download state and every other column
    /// stay as stored. Returns the number of clips written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if any statement fails; the whole
    /// batch is rolled back in that case.
    #[instrument(skip(self, clips), fields(namespace = %namespace, count = clips.len()))]
    pub async fn upsert(&self, namespace: &Namespace, clips: &[NewClip]) -> Result<u64> {
        if clips.is_empty() {
            return Ok(0);
        }

        let mut tx = self.db.pool().begin().await?;
        let mut written = 0_u64;
        for clip in clips {
            let result = sqlx::query(
                r"INSERT INTO clips (
                    namespace, id, url, embed_url,
                    broadcaster_id, broadcaster_name, creator_id, creator_name,
                    video_id, game_id, language, title, view_count, created_at,
                    thumbnail_url, duration, vod_offset, asset_url, updated_at
                  )
                  VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                  ON CONFLICT (namespace, id) DO UPDATE SET
                    view_count = excluded.view_count,
                    updated_at = excluded.updated_at",
            )
            .bind(namespace.as_str())
            .bind(&clip.id)
            .bind(&clip.url)
            .bind(&clip.embed_url)
            .bind(&clip.broadcaster_id)
            .bind(&clip.broadcaster_name)
            .bind(&clip.creator_id)
            .bind(&clip.creator_name)
            .bind(&clip.video_id)
            .bind(&clip.game_id)
            .bind(&clip.language)
            .bind(&clip.title)
            .bind(clip.view_count)
            .bind(&clip.created_at)
            .bind(&clip.thumbnail_url)
            .bind(clip.duration)
            .bind(clip.vod_offset.unwrap_or(VOD_OFFSET_ABSENT))
            .bind(&clip.asset_url)
            .bind(&clip.updated_at)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;

        debug!(written, "Upserted clip page");
        Ok(written)
    }

    /// Month of the newest stored clip, for resuming a harvest.
    ///
    /// Never fails: an empty namespace, an unparsable timestamp or a query
    /// error all yield [`YearMonth::EPOCH`].
    #[instrument(skip(self), fields(namespace = %namespace))]
    pub async fn latest_created_window(&self, namespace: &Namespace) -> YearMonth {
        let row: std::result::Result<(Option<String>,), sqlx::Error> =
            sqlx::query_as("SELECT MAX(created_at) FROM clips WHERE namespace = ?")
                .bind(namespace.as_str())
                .fetch_one(self.db.pool())
                .await;

        match row {
            Ok((Some(latest),)) => YearMonth::from_rfc3339(&latest).unwrap_or_else(|| {
                warn!(value = %latest, "Unparsable created_at; resuming from epoch");
                YearMonth::EPOCH
            }),
            Ok((None,)) => YearMonth::EPOCH,
            Err(error) => {
                warn!(error = %error, "Could not read latest clip; resuming from epoch");
                YearMonth::EPOCH
            }
        }
    }

    /// Records eligible for download, in storage order.
    ///
    /// Selects rows with `view_count >= min_view`; rows already downloaded
    /// are skipped unless `include_completed`. A positive `max_count` caps
    /// the result after ordering by `local_id`, not by popularity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self), fields(namespace = %namespace))]
    pub async fn candidate_records(
        &self,
        namespace: &Namespace,
        min_view: i64,
        max_count: i64,
        include_completed: bool,
    ) -> Result<Vec<ClipRecord>> {
        let limit = if max_count > 0 { max_count } else { NO_LIMIT };
        let records = sqlx::query_as::<_, ClipRecord>(
            r"SELECT * FROM clips
              WHERE namespace = ?
                AND view_count >= ?
                AND (? OR download_status != ?)
              ORDER BY local_id ASC
              LIMIT ?",
        )
        .bind(namespace.as_str())
        .bind(min_view)
        .bind(include_completed)
        .bind(DownloadStatus::Downloaded)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(records)
    }

    /// Writes one record's download state. Touches no other column.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] if no row has this local id in
    /// the namespace, or [`StoreError::Database`] if the update fails.
    #[instrument(skip(self), fields(namespace = %namespace, status = %status))]
    pub async fn record_outcome(
        &self,
        namespace: &Namespace,
        local_id: i64,
        status: DownloadStatus,
        path: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE clips SET download_status = ?, download_path = ? WHERE namespace = ? AND local_id = ?",
        )
        .bind(status)
        .bind(path)
        .bind(namespace.as_str())
        .bind(local_id)
        .execute(self.db.pool())
        .await?;

        check_affected(namespace, local_id, result.rows_affected())
    }

    /// Looks up one clip by platform id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self), fields(namespace = %namespace))]
    pub async fn get(&self, namespace: &Namespace, id: &str) -> Result<Option<ClipRecord>> {
        let record =
            sqlx::query_as::<_, ClipRecord>("SELECT * FROM clips WHERE namespace = ? AND id = ?")
                .bind(namespace.as_str())
                .bind(id)
                .fetch_optional(self.db.pool())
                .await?;
        Ok(record)
    }

    /// All downloaded records in the namespace, in storage order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self), fields(namespace = %namespace))]
    pub async fn completed_records(&self, namespace: &Namespace) -> Result<Vec<ClipRecord>> {
        let records = sqlx::query_as::<_, ClipRecord>(
            "SELECT * FROM clips WHERE namespace = ? AND download_status = ? ORDER BY local_id ASC",
        )
        .bind(namespace.as_str())
        .bind(DownloadStatus::Downloaded)
        .fetch_all(self.db.pool())
        .await?;
        Ok(records)
    }

    /// Number of records in the namespace with the given status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self), fields(namespace = %namespace, status = %status))]
    pub async fn count_by_status(
        &self,
        namespace: &Namespace,
        status: DownloadStatus,
    ) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM clips WHERE namespace = ? AND download_status = ?",
        )
        .bind(namespace.as_str())
        .bind(status)
        .fetch_one(self.db.pool())
        .await?;
        Ok(count)
    }
}
