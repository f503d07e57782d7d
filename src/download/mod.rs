//! Clip download pipeline.
//!
//! # Features
//!
//! - Tier 1: external stream resolver process ([`StreamlinkCli`])
//! - Tier 2: streamed GET of the derived asset URL ([`HttpClient`])
//! - Bounded per-tier retries with typed attempt outcomes ([`RetryPolicy`])
//! - Fixed-width worker pool over an immutable candidate snapshot
//!   ([`DownloadOrchestrator`])
//!
//! # Example
//!
//! ```no_run
//! use clip_archiver::download::{
//!     DownloadOrchestrator, DownloadRequest, HttpClient, HttpSettings, StreamlinkCli,
//!     TwoTierDownloader,
//! };
//! use clip_archiver::paths::PathResolver;
//! use clip_archiver::progress::NoopProgress;
//! use clip_archiver::store::{ClipStore, Namespace};
//! use clip_archiver::Database;
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ClipStore::new(Database::new(Path::new("clips.db")).await?);
//! let downloader = TwoTierDownloader::new(
//!     Arc::new(StreamlinkCli::discover(None, None)),
//!     HttpClient::new(&HttpSettings::default())?,
//! );
//! let orchestrator = DownloadOrchestrator::new(
//!     Arc::new(store),
//!     Arc::new(downloader),
//!     PathResolver::local(),
//!     Arc::new(NoopProgress),
//! );
//! let stats = orchestrator
//!     .run(
//!         &Namespace::parse("some_streamer")?,
//!         &DownloadRequest::new("./clips"),
//!         Arc::new(AtomicBool::new(false)),
//!     )
//!     .await?;
//! println!("downloaded {} of {}", stats.downloaded(), stats.candidates());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod orchestrator;
mod retry;
mod strategy;
mod streamlink;

pub use client::{HttpClient, HttpSettings, build_client};
pub use constants::{
    DEFAULT_CONCURRENCY, TIER_MAX_ATTEMPTS, TIER_RETRY_DELAY, VIDEO_EXTENSION,
    WRITE_BACK_MAX_ATTEMPTS,
};
pub use error::DownloadError;
pub use orchestrator::{DownloadOrchestrator, DownloadRequest, DownloadStats, OrchestratorError};
pub use retry::{AttemptOutcome, FailureType, RetryPolicy, classify_error, classify_http_status};
pub use strategy::{ClipDownloader, DownloadOutcome, Tier, TwoTierDownloader};
pub use streamlink::{StreamError, StreamResolver, StreamlinkCli};
