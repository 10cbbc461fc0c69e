//! Directory error types

use thiserror::Error;

/// Coordinate-resolution specific errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Transport-level failure (connect, timeout, TLS, body read)
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("endpoint returned status {status}")]
    Status { status: u16 },

    /// Endpoint answered but carried no record for the anchor
    #[error("no directory record for anchor")]
    NotFound,
}
