//! HTTP client wrapper for direct asset retrieval.
//!
//! `HttpClient` streams a clip's asset URL straight to a caller-chosen path.
//! The same builder configures the API client so both share proxy, timeout
//! and User-Agent settings.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, Proxy};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// Connection settings shared by every outbound HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Proxy URL applied to all schemes, if any.
    pub proxy: Option<String>,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            proxy: None,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

impl HttpSettings {
    /// Default timeouts with an optional proxy.
    #[must_use]
    pub fn with_proxy(proxy: Option<String>) -> Self {
        Self {
            proxy,
            ..Self::default()
        }
    }
}

/// Builds a reqwest client from shared settings.
///
/// # Errors
///
/// Returns the reqwest error when the proxy URL is invalid or the TLS
/// backend cannot be initialised.
pub fn build_client(settings: &HttpSettings) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .timeout(Duration::from_secs(settings.read_timeout_secs))
        .gzip(true)
        .user_agent(user_agent::default_user_agent());
    if let Some(proxy) = settings.proxy.as_deref() {
        builder = builder.proxy(Proxy::all(proxy)?);
    }
    builder.build()
}

/// HTTP client for streaming clip assets to disk.
///
/// Created once per run and shared by all workers for connection pooling.
///
/// # Example
///
/// ```no_run
/// use clip_archiver::download::{HttpClient, HttpSettings};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new(&HttpSettings::default())?;
/// let bytes = client
///     .download_to_path("https://clips-media.example/abc.mp4", Path::new("clip.mp4"))
///     .await?;
/// println!("wrote {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the given settings.
    ///
    /// # Errors
    ///
    /// Returns the reqwest build error (typically an invalid proxy URL).
    pub fn new(settings: &HttpSettings) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(settings)?,
        })
    }

    /// Streams `url` into `path`, replacing any existing file.
    ///
    /// Returns the number of bytes written. A partially written file is
    /// removed when the transfer fails.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is empty or malformed
    /// - The request fails (network error, timeout)
    /// - The server returns an error status (4xx, 5xx)
    /// - Writing to disk fails
    #[instrument(skip(self), fields(url = %url, path = %path.display()))]
    pub async fn download_to_path(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        if url.trim().is_empty() || Url::parse(url).is_err() {
            return Err(DownloadError::invalid_url(url));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let mut file = File::create(path)
            .await
            .map_err(|e| DownloadError::io(path, e))?;

        match stream_to_file(&mut file, response, url, path).await {
            Ok(bytes) => {
                debug!(bytes, "Asset stream complete");
                Ok(bytes)
            }
            Err(error) => {
                drop(file);
                if let Err(remove_error) = tokio::fs::remove_file(path).await {
                    warn!(error = %remove_error, "Failed to remove partial file");
                }
                Err(error)
            }
        }
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::from_reqwest(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}
