//! Turns structured email fields into the API's `raw` envelope.

use crate::error::Result;
use gsend_mime::encoding::encode_base64_url;
use gsend_mime::{Attachment, Message};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info_span};

/// Fields of one outgoing email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Sender address, written to `From`.
    pub sender: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Primary recipients; must not be empty.
    pub to: Vec<String>,
    /// Carbon-copy recipients.
    pub cc: Vec<String>,
    /// Blind carbon-copy recipients.
    pub bcc: Vec<String>,
    /// Files to attach, in order.
    pub attachments: Vec<PathBuf>,
}

impl OutgoingEmail {
    /// Creates an email with empty Cc, Bcc and attachment lists.
    #[must_use]
    pub fn new(
        sender: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        to: Vec<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            subject: subject.into(),
            body: body.into(),
            to,
            ..Self::default()
        }
    }

    /// Sets the Cc list.
    #[must_use]
    pub fn with_cc(mut self, cc: Vec<String>) -> Self {
        self.cc = cc;
        self
    }

    /// Sets the Bcc list.
    #[must_use]
    pub fn with_bcc(mut self, bcc: Vec<String>) -> Self {
        self.bcc = bcc;
        self
    }

    /// Sets the attachment paths.
    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<PathBuf>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Builds the MIME message, reading every attachment.
    ///
    /// # Errors
    ///
    /// Returns an error if To is empty, a header value is malformed, or an
    /// attachment cannot be read.
    pub fn to_message(&self) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.sender.as_str())
            .subject(self.subject.as_str())
            .text_body(self.body.as_str());

        for address in &self.to {
            builder = builder.to(address.as_str());
        }
        for address in &self.cc {
            builder = builder.cc(address.as_str());
        }
        for address in &self.bcc {
            builder = builder.bcc(address.as_str());
        }
        for path in &self.attachments {
            let attachment = Attachment::from_path(path)?;
            debug!(
                file = %path.display(),
                content_type = %attachment.content_type(),
                bytes = attachment.data().len(),
                "Attaching file"
            );
            builder = builder.attach(attachment);
        }

        Ok(builder.build()?)
    }
}

/// The request body of `messages.send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// URL-safe Base64 of the full RFC 5322 message.
    pub raw: String,
}

impl RawMessage {
    /// Encodes a composed message.
    #[must_use]
    pub fn from_message(message: &Message) -> Self {
        Self {
            raw: encode_base64_url(message.to_wire_string().as_bytes()),
        }
    }
}

/// Composes `email` and wraps it for the API.
///
/// # Errors
///
/// See [`OutgoingEmail::to_message`].
pub fn build_message(email: &OutgoingEmail) -> Result<RawMessage> {
    let span = info_span!("compose", to = email.to.len(), attachments = email.attachments.len());
    let _guard = span.enter();

    let message = email.to_message()?;
    let raw = RawMessage::from_message(&message);
    debug!(encoded_bytes = raw.raw.len(), "Message composed");
    Ok(raw)
}
