//! Tier 1: external stream resolver process.
//!
//! The resolver is a command-line tool (streamlink) invoked once per attempt
//! against the clip's page URL. Success is a zero exit status.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::constants::STREAM_QUALITY;

/// Binary name looked up on `PATH`.
const STREAMLINK_BINARY: &str = "streamlink";

/// Bytes of stderr kept for error messages.
const STDERR_TAIL_BYTES: usize = 400;

/// Failures of a single resolver invocation.
#[derive(Debug, Error)]
pub enum StreamError {
    /// No resolver binary was configured or found on `PATH`.
    #[error("stream resolver 'streamlink' not found on PATH")]
    NotInstalled,

    /// The process could not be started.
    #[error("failed to start {}: {source}", .program.display())]
    Spawn {
        /// Program that failed to start.
        program: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("stream resolver exited with {status}: {stderr}")]
    ExitStatus {
        /// Exit status description.
        status: String,
        /// Tail of captured stderr.
        stderr: String,
    },
}

impl StreamError {
    /// True when retrying the same invocation cannot help.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NotInstalled | Self::Spawn { .. })
    }
}

/// Resolves a clip page URL to a video file on disk.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// Writes the clip behind `page_url` to `output`, overwriting it.
    async fn fetch(&self, page_url: &str, output: &Path) -> Result<(), StreamError>;
}

/// Streamlink command-line invocation.
#[derive(Debug, Clone)]
pub struct StreamlinkCli {
    program: Option<PathBuf>,
    proxy: Option<String>,
    quality: String,
}

impl StreamlinkCli {
    /// Uses `program` when given, otherwise searches `PATH` for `streamlink`.
    #[must_use]
    pub fn discover(program: Option<PathBuf>, proxy: Option<String>) -> Self {
        let program = program.or_else(|| which::which(STREAMLINK_BINARY).ok());
        match &program {
            Some(path) => debug!(program = %path.display(), "Using stream resolver"),
            None => debug!("Stream resolver not found; tier 1 will be skipped"),
        }
        Self {
            program,
            proxy,
            quality: STREAM_QUALITY.to_string(),
        }
    }

    /// Uses exactly `program`, without a `PATH` search.
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>, proxy: Option<String>) -> Self {
        Self {
            program: Some(program.into()),
            proxy,
            quality: STREAM_QUALITY.to_string(),
        }
    }

    /// The resolved program path, if any.
    #[must_use]
    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    /// Arguments for one invocation:
    /// `-o <output> --force [--http-proxy <proxy>] <page_url> <quality>`.
    #[must_use]
    pub fn build_args(&self, page_url: &str, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-o".into(),
            output.as_os_str().to_owned(),
            "--force".into(),
        ];
        if let Some(proxy) = &self.proxy {
            args.push("--http-proxy".into());
            args.push(proxy.into());
        }
        args.push(page_url.into());
        args.push(self.quality.clone().into());
        args
    }
}

#[async_trait]
impl StreamResolver for StreamlinkCli {
    #[instrument(skip(self), fields(output = %output.display()))]
    async fn fetch(&self, page_url: &str, output: &Path) -> Result<(), StreamError> {
        let program = self.program.as_ref().ok_or(StreamError::NotInstalled)?;

        let result = Command::new(program)
            .args(self.build_args(page_url, output))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| StreamError::Spawn {
                program: program.clone(),
                source,
            })?;

        if result.status.success() {
            return Ok(());
        }

        Err(StreamError::ExitStatus {
            status: result.status.to_string(),
            stderr: stderr_tail(&result.stderr),
        })
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_TAIL_BYTES {
        return text.to_string();
    }
    let mut start = text.len() - STDERR_TAIL_BYTES;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
