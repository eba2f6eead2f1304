//! `OAuth2` authorization flows.

mod code;
mod loopback;
mod pkce;

pub use code::AuthorizationCodeFlow;
pub use loopback::{CallbackParams, LoopbackServer};
pub use pkce::PkceChallenge;

use crate::error::Result;
use crate::provider::{ClientSecrets, Provider};
use crate::token::{Credential, ErrorResponse, Token, TokenResponse};
use reqwest::blocking::{Client, Response};
use std::collections::HashMap;

/// Common `OAuth2` client configuration.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client ID from provider.
    pub client_id: String,
    /// Client secret (optional for public clients).
    pub client_secret: Option<String>,
    /// Redirect URI for authorization code flow.
    pub redirect_uri: Option<String>,
    /// Provider configuration.
    pub provider: Provider,
    /// HTTP client.
    http_client: Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            provider,
            http_client: Client::new(),
        }
    }

    /// Creates a client from a developer-console registration.
    #[must_use]
    pub fn from_secrets(secrets: &ClientSecrets) -> Self {
        let client = Self::new(&secrets.client_id, secrets.provider());
        match &secrets.client_secret {
            Some(secret) => client.with_client_secret(secret),
            None => client,
        }
    }

    /// Creates a client able to refresh `credential` using only what the
    /// credential itself carries.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored token URI is not a valid URL.
    pub fn for_credential(credential: &Credential) -> Result<Self> {
        let mut provider = Provider::google()?;
        provider.token_url = credential.token_uri.parse()?;

        let client = Self::new(&credential.client_id, provider);
        Ok(match &credential.client_secret {
            Some(secret) => client.with_client_secret(secret),
            None => client,
        })
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Refreshes an access token using a refresh token.
    ///
    /// The returned token keeps the old refresh token when the server
    /// does not issue a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails or if the token has no refresh token.
    pub fn refresh_token(&self, token: &Token) -> Result<Token> {
        let refresh_token = token.refresh_token()?;

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", &self.client_id);

        if let Some(secret) = &self.client_secret {
            params.insert("client_secret", secret);
        }

        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(&params)
            .send()?;

        let mut new_token = Token::from_response(read_token_response(response)?)?;

        if new_token.refresh_token.is_none() {
            new_token.refresh_token.clone_from(&token.refresh_token);
        }
        if new_token.scope.is_none() {
            new_token.scope.clone_from(&token.scope);
        }

        Ok(new_token)
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    pub(crate) fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
        code_verifier: Option<&str>,
    ) -> Result<Token> {
        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("client_id", &self.client_id);

        if let Some(uri) = redirect_uri.or(self.redirect_uri.as_deref()) {
            params.insert("redirect_uri", uri);
        }

        if let Some(secret) = &self.client_secret {
            params.insert("client_secret", secret);
        }

        if let Some(verifier) = code_verifier {
            params.insert("code_verifier", verifier);
        }

        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(&params)
            .send()?;

        Token::from_response(read_token_response(response)?)
    }
}

/// Decodes a token endpoint reply, turning non-2xx bodies into typed errors.
fn read_token_response(response: Response) -> Result<TokenResponse> {
    if !response.status().is_success() {
        let error: ErrorResponse = response.json()?;
        return Err(error.into_error());
    }
    Ok(response.json()?)
}
