//! Crate-wide error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// An inbound frame was not valid JSON or did not match any event.
    #[error("malformed event: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
