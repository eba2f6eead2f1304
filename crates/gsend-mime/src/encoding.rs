//! Transfer encodings.
//!
//! Base64 for bodies (wrapped at 76 columns), URL-safe Base64 for the API
//! envelope, RFC 2047 encoded-words for non-ASCII header text and RFC 2231
//! extended values for non-ASCII parameters.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use std::fmt::Write;

/// Maximum encoded line length for MIME bodies (RFC 2045).
const MAX_LINE_LENGTH: usize = 76;

/// Encodes data as Base64 on a single line.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 broken into CRLF-terminated 76-column lines.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);

    // Base64 output is pure ASCII, so byte chunks are valid str slices.
    for line in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        out.push_str(std::str::from_utf8(line).unwrap_or_default());
        out.push_str("\r\n");
    }
    out
}

/// URL-safe Base64 with padding, as the Gmail API expects for `raw`.
#[must_use]
pub fn encode_base64_url(data: &[u8]) -> String {
    URL_SAFE.encode(data)
}

/// Encodes header text using an RFC 2047 `B` encoded-word when needed.
///
/// Plain ASCII text without `=?` sequences is returned unchanged.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    if text.is_ascii() && !text.contains("=?") {
        return text.to_string();
    }

    let encoded = encode_base64(text.as_bytes());
    format!("=?utf-8?b?{encoded}?=")
}

/// Encodes a header parameter value as an RFC 2231 extended value
/// (`utf-8''<percent-encoded>`), for use as `name*=<value>`.
#[must_use]
pub fn encode_rfc2231(value: &str) -> String {
    let mut out = String::from("utf-8''");
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}
