//! Clip record types and download status definitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stored value for an absent VOD offset.
pub const VOD_OFFSET_ABSENT: i64 = -1;

/// Download state of a stored clip.
///
/// `Unattempted` and `Pending` are both incomplete and are selected the same
/// way; they stay distinct so a row shows whether a download was ever tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Never attempted.
    Unattempted = 0,
    /// Video file confirmed on disk.
    Downloaded = 1,
    /// Attempt started or failed; eligible for retry.
    Pending = 2,
}

impl DownloadStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unattempted => "unattempted",
            Self::Downloaded => "downloaded",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored clip row.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ClipRecord {
    /// Local sequence number; the key for outcome updates.
    pub local_id: i64,
    /// Account namespace the row belongs to.
    pub namespace: String,
    /// Platform clip id (slug).
    pub id: String,
    pub url: String,
    pub embed_url: String,
    pub broadcaster_id: String,
    pub broadcaster_name: String,
    pub creator_id: String,
    pub creator_name: String,
    pub video_id: String,
    pub game_id: String,
    pub language: String,
    pub title: String,
    pub view_count: i64,
    /// Platform creation timestamp (RFC 3339).
    pub created_at: String,
    pub thumbnail_url: String,
    /// Clip length in seconds.
    pub duration: f64,
    /// Offset into the source VOD, or [`VOD_OFFSET_ABSENT`].
    pub vod_offset: i64,
    /// Direct video URL derived from the thumbnail.
    pub asset_url: String,
    pub download_status: DownloadStatus,
    /// Output path once an attempt has been made, else empty.
    pub download_path: String,
    /// Local time of the last harvest refresh.
    pub updated_at: String,
}

impl ClipRecord {
    /// The VOD offset, or `None` when the platform reported none.
    #[must_use]
    pub fn vod_offset(&self) -> Option<i64> {
        (self.vod_offset != VOD_OFFSET_ABSENT).then_some(self.vod_offset)
    }
}

/// A harvested clip ready for upsert.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewClip {
    pub id: String,
    pub url: String,
    pub embed_url: String,
    pub broadcaster_id: String,
    pub broadcaster_name: String,
    pub creator_id: String,
    pub creator_name: String,
    pub video_id: String,
    pub game_id: String,
    pub language: String,
    pub title: String,
    pub view_count: i64,
    pub created_at: String,
    pub thumbnail_url: String,
    pub duration: f64,
    /// `None` is stored as [`VOD_OFFSET_ABSENT`].
    pub vod_offset: Option<i64>,
    pub asset_url: String,
    pub updated_at: String,
}
