//! Error types for composing and sending through the Gmail API.

/// Result type alias for Gmail operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Gmail errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Credential acquisition failed.
    #[error("Authorization failed: {0}")]
    Auth(#[from] gsend_oauth::Error),

    /// The message could not be built (bad header, unreadable attachment).
    #[error("Failed to compose message: {0}")]
    Compose(#[from] gsend_mime::Error),

    /// The credential cannot back a session.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The API call failed; `source` is the transport error unchanged.
    #[error("Failed to send message: {source}")]
    SendFailed {
        /// Underlying transport or API error.
        #[source]
        source: ApiError,
    },
}

/// Errors returned by a [`MessageTransport`](crate::MessageTransport).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Network or protocol failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the API.
    #[error("Gmail API returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or the body itself.
        message: String,
    },

    /// Success status with a body that is not a send response.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}
