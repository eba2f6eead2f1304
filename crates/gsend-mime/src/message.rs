//! `multipart/mixed` message construction and serialization.

use crate::attachment::Attachment;
use crate::content_type::ContentType;
use crate::encoding::{encode_base64_wrapped, encode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;
use rand::Rng;
use std::fmt;

/// Separator between addresses in `To`, `Cc` and `Bcc`.
const ADDRESS_SEPARATOR: &str = ", ";

/// Transfer encoding applied to a part body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII, sent as-is.
    SevenBit,
    /// Base64, wrapped at 76 columns.
    Base64,
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::Base64 => write!(f, "base64"),
        }
    }
}

/// One body part of a multipart message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Body, already transfer-encoded.
    pub body: String,
}

impl Part {
    /// Creates a new part.
    #[must_use]
    pub const fn new(headers: Headers, body: String) -> Self {
        Self { headers, body }
    }

    /// Plain-text part. ASCII text goes out as 7bit, anything else as
    /// UTF-8 in Base64.
    ///
    /// # Errors
    ///
    /// Never fails for well-formed static header names; the `Result` comes
    /// from header validation.
    pub fn text(text: &str) -> Result<Self> {
        let (charset, encoding, body) = if text.is_ascii() {
            ("us-ascii", TransferEncoding::SevenBit, normalize_newlines(text))
        } else {
            ("utf-8", TransferEncoding::Base64, encode_base64_wrapped(text.as_bytes()))
        };

        let mut headers = Headers::new();
        headers.set("Content-Type", ContentType::text_plain(charset).to_string())?;
        headers.set("Content-Transfer-Encoding", encoding.to_string())?;
        Ok(Self::new(headers, body))
    }
}

/// A composed `multipart/mixed` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Top-level headers.
    pub headers: Headers,
    /// Body parts; the text body is always first.
    pub parts: Vec<Part>,
    boundary: String,
}

impl Message {
    /// Starts building a message.
    #[must_use]
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// Multipart boundary.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Gets the Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("subject")
    }

    /// Serialized top-level header block (without the blank separator line).
    #[must_use]
    pub fn header_block(&self) -> String {
        self.headers.to_string()
    }

    /// Full wire form of the message.
    #[must_use]
    pub fn to_wire_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n", self.headers)?;
        for part in &self.parts {
            write!(f, "--{}\r\n{}\r\n", self.boundary, part.headers)?;
            f.write_str(&part.body)?;
            if !part.body.ends_with("\r\n") {
                f.write_str("\r\n")?;
            }
        }
        write!(f, "--{}--\r\n", self.boundary)
    }
}

/// Builder for [`Message`].
///
/// Recipient and attachment lists start empty for every builder.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    subject: String,
    text_body: String,
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    attachments: Vec<Attachment>,
    boundary: Option<String>,
}

impl MessageBuilder {
    /// Sets the sender.
    #[must_use]
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.text_body = body.into();
        self
    }

    /// Adds a `To` recipient.
    #[must_use]
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Adds a `Cc` recipient.
    #[must_use]
    pub fn cc(mut self, address: impl Into<String>) -> Self {
        self.cc.push(address.into());
        self
    }

    /// Adds a `Bcc` recipient.
    #[must_use]
    pub fn bcc(mut self, address: impl Into<String>) -> Self {
        self.bcc.push(address.into());
        self
    }

    /// Appends an attachment after the body and any earlier attachments.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Uses a fixed boundary instead of a random one.
    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Assembles the message.
    ///
    /// Header order is fixed: `Content-Type`, `MIME-Version`, `Subject`,
    /// `From`, `To`, `Cc`, `Bcc`. `Cc` and `Bcc` are present even when
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the sender or every `To` recipient is missing,
    /// or if a header value contains a line break.
    pub fn build(self) -> Result<Message> {
        let from = self.from.ok_or(Error::MissingField("from"))?;
        if self.to.is_empty() {
            return Err(Error::MissingField("to"));
        }

        let boundary = self.boundary.unwrap_or_else(generate_boundary);

        let mut headers = Headers::new();
        headers.set("Content-Type", ContentType::multipart_mixed(&boundary).to_string())?;
        headers.set("MIME-Version", "1.0")?;
        headers.set("Subject", encode_rfc2047(&self.subject))?;
        headers.set("From", from)?;
        headers.set("To", self.to.join(ADDRESS_SEPARATOR))?;
        headers.set("Cc", self.cc.join(ADDRESS_SEPARATOR))?;
        headers.set("Bcc", self.bcc.join(ADDRESS_SEPARATOR))?;

        let mut parts = Vec::with_capacity(1 + self.attachments.len());
        parts.push(Part::text(&self.text_body)?);
        for attachment in &self.attachments {
            parts.push(attachment.to_part()?);
        }

        Ok(Message {
            headers,
            parts,
            boundary,
        })
    }
}

/// Random boundary that cannot occur in Base64 or 7bit text we emit.
fn generate_boundary() -> String {
    let token: u64 = rand::thread_rng().r#gen();
    format!("==============={token:019}==")
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}
