//! Content client error types.

use thiserror::Error;

/// Result type alias for content operations.
pub type Result<T> = std::result::Result<T, ContentError>;

/// Errors that can occur while talking to the content repository.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Content API returned {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Content API has no master ref")]
    MissingMasterRef,

    #[error("Failed to decode document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Cursor does not belong to this repository: {0}")]
    ForeignCursor(String),

    #[error("No further pages")]
    NoMorePages,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
