//! Credential lifecycle: load from cache, refresh, or re-authorize.
//!
//! ```text
//! {absent}                      -> interactive -> {valid}
//! {valid, not expired}          -> no-op       -> {valid, not expired}
//! {valid, expired, refreshable} -> refresh     -> {valid, not expired}
//! {valid, expired, no refresh}  -> interactive -> {valid}
//! ```
//!
//! Every transition except the no-op rewrites the token cache.

use crate::error::Result;
use crate::flow::{AuthorizationCodeFlow, LoopbackServer, OAuthClient};
use crate::provider::ClientSecrets;
use crate::token::{Credential, TokenCache};
use std::path::{Path, PathBuf};
use tracing::{Span, info, info_span};

/// Obtains a brand-new credential, usually by asking the user.
pub trait Authorizer {
    /// Runs the authorization flow to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if authorization does not complete.
    fn authorize(&self) -> Result<Credential>;
}

/// Renews an expired credential without user interaction.
pub trait Refresher {
    /// Returns `credential` with a fresh access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token endpoint rejects the refresh.
    fn refresh(&self, credential: &Credential) -> Result<Credential>;
}

impl<T: Authorizer + ?Sized> Authorizer for &T {
    fn authorize(&self) -> Result<Credential> {
        (**self).authorize()
    }
}

impl<T: Refresher + ?Sized> Refresher for &T {
    fn refresh(&self, credential: &Credential) -> Result<Credential> {
        (**self).refresh(credential)
    }
}

/// Browser-driven installed-app flow backed by a client-secrets file.
///
/// The secrets file is only read when authorization is actually needed.
#[derive(Debug, Clone)]
pub struct InstalledAppFlow {
    secrets_path: PathBuf,
}

impl InstalledAppFlow {
    /// Creates a flow for the client registered in `secrets_path`.
    #[must_use]
    pub fn new(secrets_path: impl Into<PathBuf>) -> Self {
        Self {
            secrets_path: secrets_path.into(),
        }
    }
}

impl Authorizer for InstalledAppFlow {
    fn authorize(&self) -> Result<Credential> {
        let secrets = ClientSecrets::from_file(&self.secrets_path)?;
        let server = LoopbackServer::bind()?;
        let flow = AuthorizationCodeFlow::new(OAuthClient::from_secrets(&secrets)).with_pkce();

        let token = flow.run_local_server(server)?;
        Ok(Credential::new(token, &secrets))
    }
}

/// Refreshes against the token endpoint stored in the credential.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenEndpointRefresher;

impl Refresher for TokenEndpointRefresher {
    fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let client = OAuthClient::for_credential(credential)?;
        let token = client.refresh_token(&credential.token)?;
        Ok(credential.clone().with_token(token))
    }
}

/// Where a cached credential sits in the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    /// Nothing cached.
    Absent,
    /// Cached and usable as-is.
    Valid,
    /// Cached, expired, has a refresh token.
    ExpiredRefreshable,
    /// Cached, expired, no refresh token.
    ExpiredNonRefreshable,
}

impl CredentialState {
    /// Classifies a cache lookup result.
    #[must_use]
    pub fn of(credential: Option<&Credential>) -> Self {
        match credential {
            None => Self::Absent,
            Some(c) if !c.is_expired() => Self::Valid,
            Some(c) if c.can_refresh() => Self::ExpiredRefreshable,
            Some(_) => Self::ExpiredNonRefreshable,
        }
    }
}

/// Produces a valid credential from a token cache, refreshing or
/// re-authorizing as needed.
#[derive(Debug)]
pub struct CredentialManager<A, R> {
    cache: TokenCache,
    authorizer: A,
    refresher: R,
    span: Span,
}

impl CredentialManager<InstalledAppFlow, TokenEndpointRefresher> {
    /// Manager using the interactive browser flow and the real token endpoint.
    #[must_use]
    pub fn installed(credentials_file: impl Into<PathBuf>, token_file: impl Into<PathBuf>) -> Self {
        Self::new(
            TokenCache::new(token_file),
            InstalledAppFlow::new(credentials_file),
            TokenEndpointRefresher,
        )
    }
}

impl<A: Authorizer, R: Refresher> CredentialManager<A, R> {
    /// Creates a manager from its parts.
    pub fn new(cache: TokenCache, authorizer: A, refresher: R) -> Self {
        let span = info_span!("credentials", cache = %cache.path().display());
        Self {
            cache,
            authorizer,
            refresher,
            span,
        }
    }

    /// Token cache this manager reads and writes.
    pub const fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Returns a valid credential.
    ///
    /// # Errors
    ///
    /// Any cache I/O, authorization or refresh failure is returned as-is;
    /// nothing is retried.
    pub fn acquire(&self) -> Result<Credential> {
        let _guard = self.span.enter();
        info!("Getting Gmail credentials");

        let cached = self.cache.load()?;
        let state = CredentialState::of(cached.as_ref());

        let credential = match (state, cached) {
            (CredentialState::Valid, Some(credential)) => {
                info!("Using cached credential");
                return Ok(credential);
            }
            (CredentialState::ExpiredRefreshable, Some(credential)) => {
                info!("Cached credential expired, refreshing");
                self.refresher.refresh(&credential)?
            }
            (CredentialState::ExpiredNonRefreshable, _) => {
                info!("Cached credential expired and cannot be refreshed, re-authorizing");
                self.authorizer.authorize()?
            }
            _ => {
                info!("No cached credential, starting authorization");
                self.authorizer.authorize()?
            }
        };

        self.cache.save(&credential)?;
        info!("Credential saved");
        Ok(credential)
    }
}

/// Loads, refreshes or creates the Gmail credential for the given files.
///
/// # Errors
///
/// See [`CredentialManager::acquire`].
pub fn get_credentials(credentials_file: &Path, token_file: &Path) -> Result<Credential> {
    CredentialManager::installed(credentials_file, token_file).acquire()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::token::Token;
    use chrono::{Duration, Utc};

    fn credential(expires_in: i64, refresh: Option<&str>) -> Credential {
        let mut token =
            Token::new("access", "Bearer").with_expires_at(Utc::now() + Duration::seconds(expires_in));
        token.refresh_token = refresh.map(str::to_string);
        Credential {
            token,
            client_id: "cid".into(),
            client_secret: None,
            token_uri: "https://oauth2.googleapis.com/token".into(),
        }
    }

    #[test]
    fn test_state_classification() {
        assert_eq!(CredentialState::of(None), CredentialState::Absent);
        assert_eq!(
            CredentialState::of(Some(&credential(3600, None))),
            CredentialState::Valid
        );
        assert_eq!(
            CredentialState::of(Some(&credential(-10, Some("r")))),
            CredentialState::ExpiredRefreshable
        );
        assert_eq!(
            CredentialState::of(Some(&credential(-10, None))),
            CredentialState::ExpiredNonRefreshable
        );
    }

    #[test]
    fn test_installed_flow_reports_missing_secrets_file() {
        let flow = InstalledAppFlow::new("/nonexistent/gmail_credentials.json");
        let err = flow.authorize().unwrap_err();
        assert!(err.to_string().contains("gmail_credentials.json"));
    }
}
