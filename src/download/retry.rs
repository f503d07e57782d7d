//! Bounded retry loop with typed attempt outcomes.
//!
//! An operation reports each attempt as an [`AttemptOutcome`]:
//! - [`AttemptOutcome::Success`] - stop and return the value
//! - [`AttemptOutcome::Transient`] - wait, then try again while budget remains
//! - [`AttemptOutcome::Fatal`] - stop immediately, retrying would not help
//!
//! # Example
//!
//! ```
//! use clip_archiver::download::{AttemptOutcome, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let policy = RetryPolicy::new(3, Duration::ZERO, Duration::ZERO);
//! let result: Result<(u32, u32), (String, u32)> = policy
//!     .run(|attempt| async move {
//!         if attempt < 2 {
//!             AttemptOutcome::Transient(format!("attempt {attempt} failed"))
//!         } else {
//!             AttemptOutcome::Success(attempt)
//!         }
//!     })
//!     .await;
//! assert_eq!(result, Ok((2, 2)));
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use super::DownloadError;
use super::constants::{TIER_MAX_ATTEMPTS, TIER_RETRY_DELAY, TIER_RETRY_JITTER};

/// Result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome<T, E> {
    /// The attempt succeeded.
    Success(T),
    /// The attempt failed but another may succeed.
    Transient(E),
    /// The attempt failed and retrying is pointless.
    Fatal(E),
}

/// Classification of download failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, 5xx server errors, connection refused.
    Transient,

    /// Permanent failure that won't succeed regardless of retries.
    ///
    /// Examples: 404 Not Found, invalid URL, local disk errors.
    Permanent,
}

/// Attempt budget and pause between attempts.
///
/// `max_attempts` counts the initial attempt, so `2` means one retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    /// Two attempts, two seconds apart, plus up to 250 ms of jitter.
    fn default() -> Self {
        Self {
            max_attempts: TIER_MAX_ATTEMPTS,
            delay: TIER_RETRY_DELAY,
            max_jitter: TIER_RETRY_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Creates a retry policy. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            max_jitter,
        }
    }

    /// A policy that retries immediately, with no pause.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `operation` until it succeeds, fails fatally, or the budget is spent.
    ///
    /// `operation` receives the 1-indexed attempt number. On success returns
    /// the value and the attempt that produced it; on failure returns the last
    /// error and the number of attempts made.
    ///
    /// # Errors
    ///
    /// Returns `Err((last_error, attempts))` when every attempt failed or an
    /// attempt reported [`AttemptOutcome::Fatal`].
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<(T, u32), (E, u32)>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AttemptOutcome<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                AttemptOutcome::Success(value) => return Ok((value, attempt)),
                AttemptOutcome::Fatal(error) => {
                    debug!(attempt, "fatal failure, not retrying");
                    return Err((error, attempt));
                }
                AttemptOutcome::Transient(error) => {
                    if attempt >= self.max_attempts {
                        debug!(attempt, max = self.max_attempts, "max attempts reached");
                        return Err((error, attempt));
                    }
                    let pause = self.pause();
                    debug!(
                        attempt,
                        next_attempt = attempt + 1,
                        delay_ms = pause.as_millis(),
                        "will retry"
                    );
                    if !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }
                    attempt += 1;
                }
            }
        }
    }

    fn pause(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return self.delay;
        }
        let max_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter_ms = rand::thread_rng().gen_range(0..=max_ms);
        self.delay + Duration::from_millis(jitter_ms)
    }
}

/// Classifies a download error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | HTTP 408, 429, 5xx | Transient |
/// | other HTTP status | Permanent |
/// | Timeout | Transient |
/// | Network (TLS) | Permanent |
/// | Network (other) | Transient |
/// | IO | Permanent |
/// | `InvalidUrl` | Permanent |
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { status, .. } => classify_http_status(*status),
        DownloadError::Timeout { .. } => FailureType::Transient,
        DownloadError::Network { source, .. } => {
            if is_tls_error(source) {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }
        DownloadError::Io { .. } | DownloadError::InvalidUrl { .. } => FailureType::Permanent,
    }
}

/// Classifies an HTTP status code into a failure type.
#[must_use]
pub fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 | 429 | 500..=599 => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

/// Best-effort TLS detection from the error chain text.
fn is_tls_error(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(current) = source {
        let text = current.to_string().to_ascii_lowercase();
        if text.contains("certificate") || text.contains("tls") || text.contains("ssl") {
            return true;
        }
        source = current.source();
    }
    false
}
