//! # gsend-oauth
//!
//! `OAuth2` credential management for the Gmail API.
//!
//! ## Features
//!
//! - **Installed-app flow**: loopback redirect, PKCE, `state` verification
//! - **Token cache**: versioned JSON record, owner-only permissions
//! - **Refresh**: non-interactive, using the client binding stored with the token
//! - **Lifecycle**: [`CredentialManager`] picks cache / refresh / re-authorize
//!
//! ## Quick Start
//!
//! ```ignore
//! use gsend_oauth::CredentialManager;
//!
//! let manager = CredentialManager::installed(
//!     "/home/me/.gmail/gmail_credentials.json",
//!     "/home/me/.gmail/gmail_token.json",
//! );
//! let credential = manager.acquire()?;
//! println!("Bearer {}", credential.access_token());
//! ```
//!
//! ## Testing without a browser
//!
//! [`CredentialManager::new`] accepts any [`Authorizer`] and [`Refresher`],
//! so the lifecycle can be driven with stubs.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod flow;
mod manager;
pub mod provider;
pub mod token;

pub use error::{Error, Result};
pub use flow::{AuthorizationCodeFlow, LoopbackServer, OAuthClient, PkceChallenge};
pub use manager::{
    Authorizer, CredentialManager, CredentialState, InstalledAppFlow, Refresher,
    TokenEndpointRefresher, get_credentials,
};
pub use provider::{ClientSecrets, GMAIL_SCOPE, Provider};
pub use token::{Credential, Token, TokenCache};
