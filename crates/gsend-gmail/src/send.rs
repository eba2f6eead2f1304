//! Message submission.

use crate::compose::RawMessage;
use crate::error::{ApiError, Error, Result};
use crate::service::GmailService;
use serde::Deserialize;
use tracing::{debug, error, info, info_span};

/// Response of a successful `messages.send`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    /// Provider message id.
    pub id: String,
    /// Thread the message was filed under.
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Labels applied by the provider.
    #[serde(default)]
    pub label_ids: Vec<String>,
}

/// Something that can submit a raw message.
pub trait MessageTransport {
    /// Submits `message` once.
    ///
    /// # Errors
    ///
    /// Returns the transport or API failure as-is.
    fn send_raw(&self, message: &RawMessage) -> std::result::Result<SentMessage, ApiError>;
}

impl<T: MessageTransport + ?Sized> MessageTransport for &T {
    fn send_raw(&self, message: &RawMessage) -> std::result::Result<SentMessage, ApiError> {
        (**self).send_raw(message)
    }
}

impl MessageTransport for GmailService {
    fn send_raw(&self, message: &RawMessage) -> std::result::Result<SentMessage, ApiError> {
        let _guard = self.span.enter();
        let url = format!("{}/send", self.messages_url());
        debug!(%url, "POST messages.send");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(message)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Pulls `error.message` out of a Google error body, falling back to the
/// raw body and then the status reason.
fn status_error(status: reqwest::StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .ok()
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Sends `message` through `transport` exactly once.
///
/// # Errors
///
/// Returns [`Error::SendFailed`] carrying the transport error unchanged.
/// The failure is logged at error level before returning.
pub fn send_email<T: MessageTransport>(transport: &T, message: &RawMessage) -> Result<SentMessage> {
    let span = info_span!("send");
    let _guard = span.enter();

    match transport.send_raw(message) {
        Ok(sent) => {
            info!(id = %sent.id, "Message sent");
            Ok(sent)
        }
        Err(source) => {
            error!(error = %source, "Failed to send message");
            Err(Error::SendFailed { source })
        }
    }
}
