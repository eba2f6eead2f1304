//! Authorization Code Flow implementation.

use super::{LoopbackServer, OAuthClient, PkceChallenge};
use crate::error::Result;
use crate::token::Token;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use tracing::{info, warn};
use url::Url;

/// Authorization Code Flow for `OAuth2`.
///
/// Suitable for applications that can open a browser and receive the
/// authorization code via a loopback redirect.
#[derive(Debug)]
pub struct AuthorizationCodeFlow {
    client: OAuthClient,
    pkce: Option<PkceChallenge>,
}

impl AuthorizationCodeFlow {
    /// Creates a new authorization code flow.
    #[must_use]
    pub const fn new(client: OAuthClient) -> Self {
        Self { client, pkce: None }
    }

    /// Enables PKCE.
    #[must_use]
    pub fn with_pkce(mut self) -> Self {
        self.pkce = Some(PkceChallenge::generate());
        self
    }

    /// Builds the authorization URL for user consent.
    ///
    /// # Arguments
    ///
    /// * `scopes` - Optional scopes to request (uses provider defaults if None)
    /// * `state` - Optional state parameter for CSRF protection
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be constructed.
    pub fn authorization_url(&self, scopes: Option<&[String]>, state: Option<&str>) -> Result<Url> {
        let mut url = self.client.provider.auth_url.clone();

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("client_id", &self.client.client_id)
                .append_pair("response_type", "code");

            if let Some(redirect_uri) = &self.client.redirect_uri {
                pairs.append_pair("redirect_uri", redirect_uri);
            }

            let scope_str = scopes.map_or_else(
                || self.client.provider.default_scopes.join(" "),
                |s| s.join(" "),
            );

            if !scope_str.is_empty() {
                pairs.append_pair("scope", &scope_str);
            }

            if let Some(state_val) = state {
                pairs.append_pair("state", state_val);
            }

            if let Some(pkce) = &self.pkce {
                pairs
                    .append_pair("code_challenge", pkce.challenge())
                    .append_pair("code_challenge_method", pkce.method());
            }

            // Without these Google only issues a refresh token on first consent.
            if self.client.provider.is_google() {
                pairs
                    .append_pair("access_type", "offline")
                    .append_pair("prompt", "consent");
            }
        }

        Ok(url)
    }

    /// Exchanges the authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token exchange fails.
    pub fn exchange_code(&self, code: &str, redirect_uri: Option<&str>) -> Result<Token> {
        let code_verifier = self.pkce.as_ref().map(PkceChallenge::verifier);
        self.client.exchange_code(code, redirect_uri, code_verifier)
    }

    /// Runs the whole interactive flow against a bound loopback listener:
    /// open the consent page, wait for the redirect, exchange the code.
    ///
    /// The client's redirect URI is replaced with the listener's. Blocks
    /// until the browser redirects back; there is no timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the user declines, the `state` does not match,
    /// or the code exchange fails.
    pub fn run_local_server(mut self, server: LoopbackServer) -> Result<Token> {
        let redirect_uri = server.redirect_uri();
        self.client.redirect_uri = Some(redirect_uri.clone());

        let state = random_state();
        let url = self.authorization_url(None, Some(&state))?;

        info!("Please visit this URL to authorize this application: {url}");
        println!("Please visit this URL to authorize this application: {url}");
        if let Err(e) = opener::open_browser(url.as_str()) {
            warn!("Could not open a browser ({e}); open the URL above manually");
        }

        let code = server.wait_for_callback()?.into_code(&state)?;
        info!("Authorization code received, exchanging for tokens");
        self.exchange_code(&code, Some(&redirect_uri))
    }

    /// Returns the PKCE verifier if PKCE is enabled.
    #[must_use]
    pub fn pkce_verifier(&self) -> Option<&str> {
        self.pkce.as_ref().map(PkceChallenge::verifier)
    }
}

/// Unguessable `state` value for one authorization request.
fn random_state() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
