//! Error types for credential operations.

use std::io;
use std::path::PathBuf;

/// Result type alias for credential operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Credential error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error without a specific file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Reading or writing a credential file failed.
    #[error("Failed to access {}: {source}", path.display())]
    File {
        /// File that could not be accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `OAuth2` error returned by the token endpoint.
    #[error("OAuth2 error: {error} - {description}")]
    OAuth {
        /// Error code (e.g., `invalid_grant`).
        error: String,
        /// Human-readable description.
        description: String,
    },

    /// The credential has no refresh token.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// The token endpoint answered with something unusable.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// User denied authorization on the consent screen.
    #[error("User denied authorization")]
    AccessDenied,

    /// The redirect carried a `state` other than the one we sent.
    #[error("Authorization state mismatch")]
    StateMismatch,

    /// The loopback redirect could not be understood.
    #[error("Authorization callback failed: {0}")]
    Callback(String),

    /// Token cache written by an incompatible version.
    #[error("Unsupported token cache version {found} (expected {expected})")]
    UnsupportedCacheVersion {
        /// Version found in the file.
        found: u32,
        /// Version this build reads and writes.
        expected: u32,
    },

    /// Invalid configuration (client secrets, provider endpoints).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// URL parsing error.
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl Error {
    /// Creates an OAuth error from error code and description.
    #[must_use]
    pub fn oauth_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::OAuth {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Wraps an I/O error with the path it happened on.
    pub(crate) fn file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }
}
