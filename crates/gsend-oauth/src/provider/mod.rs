//! `OAuth2` provider endpoints and client-secrets files.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use url::Url;

/// Scope granting full mailbox access, including `users.messages.send`.
pub const GMAIL_SCOPE: &str = "https://mail.google.com/";

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Authorization endpoint URL.
    pub auth_url: Url,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Default scopes.
    pub default_scopes: Vec<String>,
}

impl Provider {
    /// Google endpoints with the full Gmail scope.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn google() -> Result<Self> {
        Ok(Self {
            auth_url: Url::parse("https://accounts.google.com/o/oauth2/v2/auth")?,
            token_url: Url::parse("https://oauth2.googleapis.com/token")?,
            default_scopes: vec![GMAIL_SCOPE.to_string()],
        })
    }

    /// Whether the authorization endpoint is Google's, which needs
    /// `access_type=offline` to hand out refresh tokens.
    #[must_use]
    pub fn is_google(&self) -> bool {
        self.auth_url
            .host_str()
            .is_some_and(|host| host == "accounts.google.com")
    }
}

/// Client registration read from the developer console's JSON download.
#[derive(Debug, Clone)]
pub struct ClientSecrets {
    /// Client ID.
    pub client_id: String,
    /// Client secret (absent for some public clients).
    pub client_secret: Option<String>,
    /// Authorization endpoint.
    pub auth_uri: Url,
    /// Token endpoint.
    pub token_uri: Url,
}

#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<RawSecrets>,
    web: Option<RawSecrets>,
}

#[derive(Deserialize)]
struct RawSecrets {
    client_id: String,
    client_secret: Option<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

impl ClientSecrets {
    /// Reads a client-secrets JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid
    /// client-secrets document.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
        Self::parse(&content)
    }

    /// Parses a client-secrets JSON document.
    ///
    /// Accepts both the `installed` and the `web` layouts. Missing
    /// endpoints fall back to Google's.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has neither section.
    pub fn parse(json: &str) -> Result<Self> {
        let file: SecretsFile = serde_json::from_str(json)?;

        let raw = file.installed.or(file.web).ok_or_else(|| {
            Error::InvalidConfig(
                "client secrets must contain an \"installed\" or \"web\" section".into(),
            )
        })?;

        if raw.client_id.trim().is_empty() {
            return Err(Error::InvalidConfig("client_id is empty".into()));
        }

        let google = Provider::google()?;
        let auth_uri = match raw.auth_uri {
            Some(uri) => Url::parse(&uri)?,
            None => google.auth_url,
        };
        let token_uri = match raw.token_uri {
            Some(uri) => Url::parse(&uri)?,
            None => google.token_url,
        };

        Ok(Self {
            client_id: raw.client_id,
            client_secret: raw.client_secret.filter(|s| !s.is_empty()),
            auth_uri,
            token_uri,
        })
    }

    /// Provider configuration for the endpoints named in this file.
    #[must_use]
    pub fn provider(&self) -> Provider {
        Provider {
            auth_url: self.auth_uri.clone(),
            token_url: self.token_uri.clone(),
            default_scopes: vec![GMAIL_SCOPE.to_string()],
        }
    }
}
