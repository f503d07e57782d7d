//! Error types for remote API calls.

use thiserror::Error;

use crate::download::{FailureType, classify_http_status};

/// Errors from the authentication and listing endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Building the HTTP client failed (usually an invalid proxy URL).
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Network-level error.
    #[error("network error calling {endpoint}: {source}")]
    Network {
        /// Endpoint that failed.
        endpoint: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out.
    #[error("timeout calling {endpoint}")]
    Timeout {
        /// Endpoint that timed out.
        endpoint: String,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} from {endpoint}: {message}")]
    HttpStatus {
        /// Endpoint that answered.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Error message from the body, or the raw body.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response from {endpoint}: {message}")]
    Decode {
        /// Endpoint that answered.
        endpoint: String,
        /// Decoder message.
        message: String,
    },

    /// A configured base URL is malformed.
    #[error("invalid API URL '{url}'")]
    InvalidUrl {
        /// Rejected URL.
        url: String,
    },

    /// No account matched the requested login or id.
    #[error("account '{query}' not found")]
    AccountNotFound {
        /// Login or id that was looked up.
        query: String,
    },
}

impl ApiError {
    pub(crate) fn from_reqwest(endpoint: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else if source.is_decode() {
            Self::Decode {
                endpoint: endpoint.to_string(),
                message: source.to_string(),
            }
        } else {
            Self::Network {
                endpoint: endpoint.to_string(),
                source,
            }
        }
    }

    /// True when the same request may succeed if repeated.
    ///
    /// Network failures, timeouts, 408, 429 and 5xx are transient; bad
    /// credentials, unknown accounts and malformed responses are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => {
                classify_http_status(*status) == FailureType::Transient
            }
            Self::Client(_)
            | Self::Decode { .. }
            | Self::InvalidUrl { .. }
            | Self::AccountNotFound { .. } => false,
        }
    }
}
