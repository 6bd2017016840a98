//! Adapter error types.

use thiserror::Error;

/// Errors raised by a provider's HTTP client before they are classified
/// into the gateway taxonomy.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Transport-level failure (connect, TLS, timeout, decode).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error detail extracted from the response body.
        message: String,
    },
}

impl AdapterError {
    /// Returns the HTTP status code, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            AdapterError::Http(e) => e.status().map(|s| s.as_u16()),
            AdapterError::Api { status, .. } => Some(*status),
        }
    }
}
