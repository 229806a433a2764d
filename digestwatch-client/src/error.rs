//! Error types for the digestwatch client

use thiserror::Error;

/// Result type alias for fetch operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while fetching an upstream signal
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a usable response arrived
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status code
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// URL that produced it
        url: String,
    },

    /// Failed to parse a response body
    #[error("failed to parse response: {0}")]
    ParseError(String),
}
