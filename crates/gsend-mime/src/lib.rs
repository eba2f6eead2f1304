//! # gsend-mime
//!
//! Builds `multipart/mixed` email messages for submission through the
//! Gmail API.
//!
//! ## Features
//!
//! - **Message generation**: text body first, attachments after, in order
//! - **Attachments**: content type inferred from the file extension
//! - **Encoding**: Base64 bodies, RFC 2047 subjects, URL-safe Base64 envelope
//! - **Header safety**: values with embedded line breaks are rejected
//!
//! ## Quick Start
//!
//! ```ignore
//! use gsend_mime::{Attachment, Message};
//!
//! let message = Message::builder()
//!     .from("sender@example.com")
//!     .to("recipient@example.com")
//!     .subject("Document")
//!     .text_body("Please find the attached document.")
//!     .attach(Attachment::from_path("document.pdf")?)
//!     .build()?;
//!
//! println!("{message}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attachment;
mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use attachment::{Attachment, guess_content_type};
pub use content_type::{ContentType, MediaCategory};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, MessageBuilder, Part, TransferEncoding};
