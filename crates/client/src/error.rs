//! Client error types.

use thiserror::Error;

/// Errors surfaced by the API client and local storage.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never got an answer (connection refused, timeout, ...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    /// Local storage could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    /// Rejected before any request or storage write.
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    /// A locally stored record does not exist.
    #[error("{0}")]
    NotFound(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// HTTP status of a server-side rejection.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server rejected the bearer token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }
}
