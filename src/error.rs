//! Error types for stub registration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while defining or registering stubs.
///
/// Unmatched requests are not errors: they are delivered as 599 responses.
#[derive(Debug, Error)]
pub enum MockError {
    /// A stub body file could not be read at registration time.
    #[error("failed to read stub file {}: {source}", .path.display())]
    StubFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid request method: {0}")]
    InvalidMethod(String),

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid status code: {0}")]
    InvalidStatus(u16),

    /// A body processor failed to render the stub body.
    #[error("template rendering failed: {0}")]
    Template(String),

    /// A configured body could not be decoded.
    #[error("invalid stub body: {0}")]
    Body(String),
}

pub type Result<T> = std::result::Result<T, MockError>;
