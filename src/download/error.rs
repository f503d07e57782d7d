//! Error types for direct asset retrieval.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of one Tier 2 attempt.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Connection, TLS or mid-stream transport failure.
    #[error("network error fetching asset {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The asset request exceeded the client timeout.
    #[error("timeout fetching asset {url}")]
    Timeout { url: String },

    /// The asset host answered with a non-success status.
    #[error("HTTP {status} fetching asset {url}")]
    HttpStatus { url: String, status: u16 },

    /// Creating or writing the output file failed.
    #[error("IO error writing clip to {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The record has no usable asset URL (empty when the thumbnail had no
    /// preview marker).
    #[error("invalid asset URL: '{url}'")]
    InvalidUrl { url: String },
}

impl DownloadError {
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Maps a reqwest send/stream failure onto timeout or network.
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_errors_name_the_url() {
        let url = "https://clips.example/a.mp4";
        assert_eq!(
            DownloadError::timeout(url).to_string(),
            "timeout fetching asset https://clips.example/a.mp4"
        );
        assert_eq!(
            DownloadError::http_status(url, 404).to_string(),
            "HTTP 404 fetching asset https://clips.example/a.mp4"
        );
    }

    #[test]
    fn test_download_error_io_display() {
        let error = DownloadError::io(
            "/out/clip.mp4",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(error.to_string().contains("/out/clip.mp4"));
    }

    #[test]
    fn test_download_error_invalid_url_display() {
        let error = DownloadError::invalid_url("");
        assert_eq!(error.to_string(), "invalid asset URL: ''");
    }
}
