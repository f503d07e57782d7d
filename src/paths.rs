//! Output path resolution for archived clips.
//!
//! Every clip maps to one deterministic base path (no extension):
//!
//! ```text
//! <target>/<Broadcaster> (<namespace>)/YYYY/YYYY-MM/YYYY-MM-DD/[YYYYMMDD-HHMMSS] <title> (<id[..10]>)
//! ```
//!
//! Callers append `.mp4` or `.json`. Dates are rendered in a fixed
//! presentation offset so the same record always lands in the same place.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use thiserror::Error;
use tracing::instrument;

use crate::store::ClipRecord;

/// Byte budget for the title part of a filename.
pub const TITLE_BYTE_BUDGET: usize = 180;

/// Characters of the clip id kept in the filename.
const ID_PREFIX_CHARS: usize = 10;

/// Marker appended to a truncated title.
const ELLIPSIS: &str = "...";

/// Path resolution failures.
#[derive(Debug, Error)]
pub enum PathError {
    /// `created_at` is not an RFC 3339 timestamp.
    #[error("invalid created_at timestamp '{value}' for clip {clip_id}")]
    InvalidTimestamp {
        /// Clip whose timestamp failed to parse.
        clip_id: String,
        /// Raw timestamp.
        value: String,
    },

    /// Creating the directory hierarchy failed.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Maps clip records to filesystem paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathResolver {
    offset: FixedOffset,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::utc()
    }
}

impl PathResolver {
    /// Resolver that renders dates at `offset`.
    #[must_use]
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Resolver that renders dates in UTC.
    #[must_use]
    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Resolver using the host's current local offset, fixed for the run.
    #[must_use]
    pub fn local() -> Self {
        Self::new(Local::now().offset().fix())
    }

    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Computes the base path without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidTimestamp`] when `created_at` does not parse.
    pub fn plan(&self, target_dir: &Path, record: &ClipRecord) -> Result<PathBuf, PathError> {
        let created = DateTime::parse_from_rfc3339(record.created_at.trim())
            .map_err(|_| PathError::InvalidTimestamp {
                clip_id: record.id.clone(),
                value: record.created_at.clone(),
            })?
            .with_timezone(&self.offset);

        let account_dir = safe_segment(&sanitize(&format!(
            "{} ({})",
            record.broadcaster_name, record.namespace
        )));
        let year = created.format("%Y").to_string();
        let month = created.format("%Y-%m").to_string();
        let day = created.format("%Y-%m-%d").to_string();

        let title = fit_title(record.title.trim(), TITLE_BYTE_BUDGET);
        let id_prefix: String = record.id.chars().take(ID_PREFIX_CHARS).collect();
        let file_name = safe_segment(&format!(
            "[{}] {title} ({})",
            created.format("%Y%m%d-%H%M%S"),
            sanitize(&id_prefix)
        ));

        Ok(target_dir
            .join(account_dir)
            .join(year)
            .join(month)
            .join(day)
            .join(file_name))
    }

    /// Computes the base path and creates its parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] when the timestamp is invalid or the directories
    /// cannot be created.
    #[instrument(skip(self, record), fields(clip = %record.id))]
    pub async fn resolve(
        &self,
        target_dir: &Path,
        record: &ClipRecord,
    ) -> Result<PathBuf, PathError> {
        let path = self.plan(target_dir, record)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PathError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        Ok(path)
    }
}

/// Appends `.ext` to a base path that may already contain dots.
#[must_use]
pub fn with_extension(base: &Path, ext: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Replacement for a character that is invalid in file names, or `None`
/// when the character is kept as is. Line breaks map to nothing.
fn escape(c: char) -> Option<&'static str> {
    match c {
        ':' => Some("%3A"),
        '/' => Some("%2F"),
        '\\' => Some("%5C"),
        '*' => Some("%2A"),
        '?' => Some("%3F"),
        '"' => Some("%22"),
        '<' => Some("%3C"),
        '>' => Some("%3E"),
        '|' => Some("%7C"),
        '\n' | '\r' => Some(""),
        _ => None,
    }
}

/// Replaces characters that are invalid on common filesystems with
/// percent-style escapes and drops line breaks.
#[must_use]
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match escape(c) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    out
}

/// Sanitizes `title` and keeps at most `budget` bytes of the result.
///
/// The cut never lands inside a character or an escape sequence. A cut
/// title is trimmed and gets `...` appended.
#[must_use]
pub fn fit_title(title: &str, budget: usize) -> String {
    let mut out = String::with_capacity(budget.min(title.len()));
    for c in title.chars() {
        let replacement = escape(c);
        let width = replacement.map_or(c.len_utf8(), str::len);
        if out.len() + width > budget {
            return format!("{}{ELLIPSIS}", out.trim());
        }
        match replacement {
            Some(replacement) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    out
}

/// Keeps a single path component from escaping its parent.
fn safe_segment(name: &str) -> String {
    if name.trim().is_empty() {
        return "_".to_string();
    }
    let dot_segment = Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if dot_segment {
        name.replace('.', "_")
    } else {
        name.to_string()
    }
}
