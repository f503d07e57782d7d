//! Two-tier download strategy for one clip.
//!
//! Tier 1 runs the stream resolver against the clip page. Only when it has
//! spent its attempts does Tier 2 fetch the derived asset URL directly.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::client::HttpClient;
use super::retry::{AttemptOutcome, FailureType, RetryPolicy, classify_error};
use super::streamlink::StreamResolver;
use crate::store::ClipRecord;

/// Which strategy produced the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// External stream resolver.
    Stream,
    /// Direct GET of the asset URL.
    Asset,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream => write!(f, "stream"),
            Self::Asset => write!(f, "asset"),
        }
    }
}

/// Result of running every tier for one clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file is on disk.
    Downloaded {
        /// Tier that succeeded.
        tier: Tier,
        /// Attempts spent in that tier.
        attempts: u32,
    },
    /// Both tiers failed.
    Exhausted {
        /// Last Tier 1 error.
        stream_error: String,
        /// Last Tier 2 error.
        asset_error: String,
    },
}

impl DownloadOutcome {
    #[must_use]
    pub fn is_downloaded(&self) -> bool {
        matches!(self, Self::Downloaded { .. })
    }
}

/// Downloads one clip to a path. Never fails; exhaustion is an outcome.
#[async_trait]
pub trait ClipDownloader: Send + Sync {
    async fn download(&self, record: &ClipRecord, output: &Path) -> DownloadOutcome;
}

/// Stream resolver first, direct asset retrieval as fallback.
#[derive(Clone)]
pub struct TwoTierDownloader {
    resolver: Arc<dyn StreamResolver>,
    http: HttpClient,
    stream_policy: RetryPolicy,
    asset_policy: RetryPolicy,
}

impl fmt::Debug for TwoTierDownloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwoTierDownloader")
            .field("stream_policy", &self.stream_policy)
            .field("asset_policy", &self.asset_policy)
            .finish_non_exhaustive()
    }
}

impl TwoTierDownloader {
    /// Creates a downloader with the default per-tier retry policy.
    #[must_use]
    pub fn new(resolver: Arc<dyn StreamResolver>, http: HttpClient) -> Self {
        Self {
            resolver,
            http,
            stream_policy: RetryPolicy::default(),
            asset_policy: RetryPolicy::default(),
        }
    }

    /// Overrides the retry policy of both tiers.
    #[must_use]
    pub fn with_policies(mut self, stream_policy: RetryPolicy, asset_policy: RetryPolicy) -> Self {
        self.stream_policy = stream_policy;
        self.asset_policy = asset_policy;
        self
    }

    async fn try_stream(&self, page_url: &str, output: &Path) -> Result<u32, String> {
        let result = self
            .stream_policy
            .run(move |attempt| async move {
                match self.resolver.fetch(page_url, output).await {
                    Ok(()) => AttemptOutcome::Success(()),
                    Err(error) => {
                        debug!(attempt, error = %error, "Stream attempt failed");
                        if error.is_fatal() {
                            AttemptOutcome::Fatal(error)
                        } else {
                            AttemptOutcome::Transient(error)
                        }
                    }
                }
            })
            .await;

        result
            .map(|((), attempts)| attempts)
            .map_err(|(error, attempts)| {
                warn!(attempts, error = %error, "Stream tier exhausted");
                error.to_string()
            })
    }

    async fn try_asset(&self, asset_url: &str, output: &Path) -> Result<u32, String> {
        let result = self
            .asset_policy
            .run(move |attempt| async move {
                match self.http.download_to_path(asset_url, output).await {
                    Ok(bytes) => AttemptOutcome::Success(bytes),
                    Err(error) => {
                        debug!(attempt, error = %error, "Asset attempt failed");
                        match classify_error(&error) {
                            FailureType::Transient => AttemptOutcome::Transient(error),
                            FailureType::Permanent => AttemptOutcome::Fatal(error),
                        }
                    }
                }
            })
            .await;

        result
            .map(|(_bytes, attempts)| attempts)
            .map_err(|(error, attempts)| {
                warn!(attempts, error = %error, "Asset tier exhausted");
                error.to_string()
            })
    }
}

#[async_trait]
impl ClipDownloader for TwoTierDownloader {
    #[instrument(skip(self, record), fields(clip = %record.id, output = %output.display()))]
    async fn download(&self, record: &ClipRecord, output: &Path) -> DownloadOutcome {
        let stream_error = match self.try_stream(&record.url, output).await {
            Ok(attempts) => {
                info!(tier = %Tier::Stream, attempts, "Clip downloaded");
                return DownloadOutcome::Downloaded {
                    tier: Tier::Stream,
                    attempts,
                };
            }
            Err(error) => error,
        };

        match self.try_asset(&record.asset_url, output).await {
            Ok(attempts) => {
                info!(tier = %Tier::Asset, attempts, "Clip downloaded");
                DownloadOutcome::Downloaded {
                    tier: Tier::Asset,
                    attempts,
                }
            }
            Err(asset_error) => DownloadOutcome::Exhausted {
                stream_error,
                asset_error,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::download::client::HttpSettings;
    use crate::download::streamlink::StreamError;
    use crate::store::DownloadStatus;

    /// Fails `failures` times, then succeeds.
    struct FlakyResolver {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl StreamResolver for FlakyResolver {
        async fn fetch(&self, _page_url: &str, output: &Path) -> Result<(), StreamError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(StreamError::ExitStatus {
                    status: "exit status: 1".to_string(),
                    stderr: "no playable streams".to_string(),
                });
            }
            std::fs::write(output, b"stream").unwrap();
            Ok(())
        }
    }

    struct MissingResolver;

    #[async_trait]
    impl StreamResolver for MissingResolver {
        async fn fetch(&self, _page_url: &str, _output: &Path) -> Result<(), StreamError> {
            Err(StreamError::NotInstalled)
        }
    }

    fn record(asset_url: String) -> ClipRecord {
        ClipRecord {
            local_id: 1,
            namespace: "streamer".to_string(),
            id: "SlugOne".to_string(),
            url: "https://clips.example.tv/SlugOne".to_string(),
            embed_url: String::new(),
            broadcaster_id: "1".to_string(),
            broadcaster_name: "Streamer".to_string(),
            creator_id: String::new(),
            creator_name: String::new(),
            video_id: String::new(),
            game_id: String::new(),
            language: "en".to_string(),
            title: "title".to_string(),
            view_count: 10,
            created_at: "2020-01-01T00:00:00Z".to_string(),
            thumbnail_url: String::new(),
            duration: 30.0,
            vod_offset: -1,
            asset_url,
            download_status: DownloadStatus::Unattempted,
            download_path: String::new(),
            updated_at: "2020-01-01T00:00:00Z".to_string(),
        }
    }

    fn downloader(resolver: Arc<dyn StreamResolver>) -> TwoTierDownloader {
        TwoTierDownloader::new(resolver, HttpClient::new(&HttpSettings::default()).unwrap())
            .with_policies(RetryPolicy::immediate(2), RetryPolicy::immediate(2))
    }

    #[tokio::test]
    async fn test_stream_success_on_retry_skips_asset() {
        let resolver = Arc::new(FlakyResolver {
            failures: 1,
            calls: AtomicU32::new(0),
        });
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("a.mp4");

        let outcome = downloader(resolver.clone())
            .download(&record("http://127.0.0.1:9/never".to_string()), &output)
            .await;

        assert_eq!(
            outcome,
            DownloadOutcome::Downloaded {
                tier: Tier::Stream,
                attempts: 2
            }
        );
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_resolver_falls_back_after_one_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/asset.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"asset".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("a.mp4");
        let outcome = downloader(Arc::new(MissingResolver))
            .download(&record(format!("{}/asset.mp4", server.uri())), &output)
            .await;

        assert_eq!(
            outcome,
            DownloadOutcome::Downloaded {
                tier: Tier::Asset,
                attempts: 1
            }
        );
        assert_eq!(std::fs::read(&output).unwrap(), b"asset");
    }

    #[tokio::test]
    async fn test_permanent_asset_error_stops_tier_early() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let outcome = downloader(Arc::new(MissingResolver))
            .download(
                &record(format!("{}/asset.mp4", server.uri())),
                &dir.path().join("a.mp4"),
            )
            .await;

        match outcome {
            DownloadOutcome::Exhausted {
                stream_error,
                asset_error,
            } => {
                assert!(stream_error.contains("not found"));
                assert!(asset_error.contains("404"));
            }
            other => panic!("Expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_asset_url_exhausts() {
        let dir = TempDir::new().unwrap();
        let outcome = downloader(Arc::new(MissingResolver))
            .download(&record(String::new()), &dir.path().join("a.mp4"))
            .await;
        assert!(!outcome.is_downloaded());
    }
}
