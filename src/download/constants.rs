//! Constants for the download module (timeouts, attempt budgets).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for long clips).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Attempts per tier before moving on.
pub const TIER_MAX_ATTEMPTS: u32 = 2;

/// Pause between attempts within a tier.
pub const TIER_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Upper bound of random jitter added to the pause.
pub const TIER_RETRY_JITTER: Duration = Duration::from_millis(250);

/// Attempts for one status write-back while the store reports contention.
pub const WRITE_BACK_MAX_ATTEMPTS: u32 = 3;

/// Pause between write-back attempts.
pub const WRITE_BACK_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Default worker pool width.
pub const DEFAULT_CONCURRENCY: usize = 6;

/// Quality selector passed to the stream resolver.
pub const STREAM_QUALITY: &str = "best";

/// Extension appended to the resolved base path for video files.
pub const VIDEO_EXTENSION: &str = "mp4";
