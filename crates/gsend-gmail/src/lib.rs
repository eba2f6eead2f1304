//! # gsend-gmail
//!
//! Composes a multipart email and submits it through the Gmail API's
//! `messages.send` endpoint.
//!
//! ## Quick Start
//!
//! ```ignore
//! use gsend_gmail::{OutgoingEmail, build_message, build_service, send_email};
//!
//! let credential = gsend_oauth::get_credentials(secrets_path, token_path)?;
//! let service = build_service(&credential)?;
//! let email = OutgoingEmail::new("me@example.com", "Hi", "Hello", vec!["you@example.com".into()]);
//! let sent = send_email(&service, &build_message(&email)?)?;
//! println!("sent {}", sent.id);
//! ```
//!
//! [`send_email`] takes any [`MessageTransport`], so it can be exercised
//! without the network.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod compose;
mod error;
mod send;
mod service;

pub use compose::{OutgoingEmail, RawMessage, build_message};
pub use error::{ApiError, Error, Result};
pub use send::{MessageTransport, SentMessage, send_email};
pub use service::{API_VERSION, GMAIL_API_BASE, GmailService, USER_ID, build_service};
