//! JSON metadata files written next to archived clips.
//!
//! The document mirrors the platform's clip object plus the derived asset
//! URL. Local bookkeeping (`local_id`, `namespace`, download status and path)
//! is not part of it.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::paths::{PathResolver, with_extension};
use crate::store::ClipRecord;

/// Extension of sidecar files.
pub const SIDECAR_EXTENSION: &str = "json";

/// Errors produced by sidecar generation.
#[derive(Debug, Error)]
pub enum SidecarError {
    /// I/O error writing the sidecar file to disk.
    #[error("I/O error writing sidecar {}: {source}", .path.display())]
    Io {
        /// Sidecar path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// External representation of a clip.
#[derive(Debug, Serialize)]
struct ClipSidecar<'a> {
    id: &'a str,
    url: &'a str,
    embed_url: &'a str,
    broadcaster_id: &'a str,
    broadcaster_name: &'a str,
    creator_id: &'a str,
    creator_name: &'a str,
    video_id: &'a str,
    game_id: &'a str,
    language: &'a str,
    title: &'a str,
    view_count: i64,
    created_at: &'a str,
    thumbnail_url: &'a str,
    duration: f64,
    vod_offset: Option<i64>,
    asset_url: &'a str,
    updated_at: &'a str,
}

impl<'a> From<&'a ClipRecord> for ClipSidecar<'a> {
    fn from(record: &'a ClipRecord) -> Self {
        Self {
            id: &record.id,
            url: &record.url,
            embed_url: &record.embed_url,
            broadcaster_id: &record.broadcaster_id,
            broadcaster_name: &record.broadcaster_name,
            creator_id: &record.creator_id,
            creator_name: &record.creator_name,
            video_id: &record.video_id,
            game_id: &record.game_id,
            language: &record.language,
            title: &record.title,
            view_count: record.view_count,
            created_at: &record.created_at,
            thumbnail_url: &record.thumbnail_url,
            duration: record.duration,
            vod_offset: record.vod_offset(),
            asset_url: &record.asset_url,
            updated_at: &record.updated_at,
        }
    }
}

/// Writes `<base>.json` for `record`, replacing any existing file.
///
/// # Errors
///
/// Returns [`SidecarError`] on I/O or serialization failure.
#[instrument(skip(record), fields(clip = %record.id, base = %base.display()))]
pub async fn write_sidecar(base: &Path, record: &ClipRecord) -> Result<PathBuf, SidecarError> {
    let path = with_extension(base, SIDECAR_EXTENSION);
    let mut document = serde_json::to_vec_pretty(&ClipSidecar::from(record))?;
    document.push(b'\n');
    tokio::fs::write(&path, document)
        .await
        .map_err(|source| SidecarError::Io {
            path: path.clone(),
            source,
        })?;

    debug!(path = %path.display(), "Sidecar written");
    Ok(path)
}

/// Counts from a bulk export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    written: usize,
    failed: usize,
}

impl ExportStats {
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }
}

/// Writes a sidecar for each record at its resolved path under `target_dir`.
///
/// Failures are logged and counted; the export continues.
#[instrument(skip(records, resolver), fields(count = records.len(), target = %target_dir.display()))]
pub async fn export_sidecars(
    records: &[ClipRecord],
    target_dir: &Path,
    resolver: &PathResolver,
) -> ExportStats {
    let mut stats = ExportStats::default();
    for record in records {
        let result = match resolver.resolve(target_dir, record).await {
            Ok(base) => write_sidecar(&base, record)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match result {
            Ok(_) => stats.written += 1,
            Err(error) => {
                warn!(clip = %record.id, error = %error, "Sidecar export failed");
                stats.failed += 1;
            }
        }
    }
    info!(
        written = stats.written,
        failed = stats.failed,
        "Sidecar export complete"
    );
    stats
}
