//! Gmail API session handle.

use crate::error::{Error, Result};
use gsend_oauth::Credential;
use std::fmt;
use std::time::Duration;
use tracing::{Span, debug, info_span};

/// Gmail API host.
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com";

/// Pinned API version.
pub const API_VERSION: &str = "v1";

/// User id meaning "the authenticated user".
pub const USER_ID: &str = "me";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A live API client bound to one access token.
///
/// Built fresh for every run and never persisted.
pub struct GmailService {
    pub(crate) client: reqwest::blocking::Client,
    pub(crate) access_token: String,
    pub(crate) span: Span,
    base_url: String,
}

impl GmailService {
    /// Creates a session against the public Gmail API.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the HTTP client cannot be
    /// built.
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(access_token, GMAIL_API_BASE)
    }

    /// Creates a session against another host (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the HTTP client cannot be
    /// built.
    pub fn with_base_url(access_token: impl Into<String>, base_url: &str) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(Error::InvalidCredential("empty access token".into()));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("gsend/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Client)?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let span = info_span!("gmail", version = API_VERSION, user = USER_ID);
        span.in_scope(|| debug!(%base_url, "Gmail session ready"));

        Ok(Self {
            client,
            access_token,
            span,
            base_url,
        })
    }

    /// API host this session talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Collection URL for the user's messages.
    #[must_use]
    pub fn messages_url(&self) -> String {
        format!("{}/gmail/{API_VERSION}/users/{USER_ID}/messages", self.base_url)
    }
}

impl fmt::Debug for GmailService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GmailService")
            .field("base_url", &self.base_url)
            .field("access_token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

/// Builds a session handle from a credential.
///
/// # Errors
///
/// Returns [`Error::InvalidCredential`] if the credential has no access
/// token.
pub fn build_service(credential: &Credential) -> Result<GmailService> {
    GmailService::new(credential.access_token())
}
