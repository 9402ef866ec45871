//! Error types shared by the retry engine and its transports.
//!
//! [`TransportError`] is the "exception" half of an attempt outcome: what a
//! physical send raised instead of producing a response. The checkers only need
//! to know whether a failure happened below HTTP (and is therefore worth
//! repeating) or whether the request itself is at fault.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for a single physical send.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Failure raised by a transport instead of a response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not establish or keep a connection (refused, reset, DNS).
    #[error("Connection error: {0}")]
    Connection(String),

    /// The request did not complete in time.
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    /// The request could not be built or was rejected before it left the client.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request or response body could not be encoded or decoded.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Protocol-level HTTP failure that is not a connection problem.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Local I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The logical request was cancelled while waiting to retry.
    #[error("Request cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Number of physical sends performed before cancellation
        attempts: u32,
    },
}

impl TransportError {
    /// Whether this failure happened in the network layer.
    ///
    /// Network failures may succeed on a second send; everything else describes
    /// a request or local condition that repeating cannot fix.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

/// Errors raised while refreshing credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The refresh callback failed.
    #[error("Credential refresh failed: {0}")]
    Refresh(#[source] anyhow::Error),

    /// The refresh callback produced an empty token.
    #[error("Credential refresh returned an empty token")]
    EmptyToken,
}

/// Errors raised while loading a [`RetryConfig`](crate::config::RetryConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv {
        /// Variable name
        var: &'static str,
        /// Raw value found in the environment
        value: String,
    },

    /// A status code outside the 100..=599 range.
    #[error("Invalid HTTP status code: {0}")]
    InvalidStatus(u16),

    /// A backoff parameter outside its usable range.
    #[error("Invalid backoff {field}: {value}")]
    InvalidBackoff {
        /// Parameter name
        field: &'static str,
        /// Offending value
        value: f64,
    },

    /// A configuration document could not be deserialized.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
