//! End-to-end composition and submission tests.
//!
//! Submission is exercised both through a stub transport and against a
//! one-shot HTTP server on the loopback interface.

#![allow(clippy::unwrap_used)]

use std::cell::Cell;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use gsend_gmail::{
    ApiError, Error, GmailService, MessageTransport, OutgoingEmail, RawMessage, SentMessage,
    build_message, build_service, send_email,
};
use gsend_oauth::{Credential, Token};
use tracing_subscriber::fmt::MakeWriter;

fn decode(raw: &RawMessage) -> String {
    String::from_utf8(URL_SAFE.decode(&raw.raw).unwrap()).unwrap()
}

fn simple_email() -> OutgoingEmail {
    OutgoingEmail::new("a@x.com", "Test", "Hello", vec!["b@x.com".into()])
}

struct AcceptingTransport {
    calls: Cell<usize>,
}

impl MessageTransport for AcceptingTransport {
    fn send_raw(&self, _message: &RawMessage) -> Result<SentMessage, ApiError> {
        self.calls.set(self.calls.get() + 1);
        Ok(SentMessage {
            id: "18c1f0".into(),
            thread_id: Some("18c1f0".into()),
            label_ids: vec!["SENT".into()],
        })
    }
}

struct RejectingTransport {
    calls: Cell<usize>,
}

impl MessageTransport for RejectingTransport {
    fn send_raw(&self, _message: &RawMessage) -> Result<SentMessage, ApiError> {
        self.calls.set(self.calls.get() + 1);
        Err(ApiError::Status {
            status: 403,
            message: "Insufficient Permission".into(),
        })
    }
}

/// Shared buffer that collects formatted log output.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Serves a single HTTP response and returns the request it received.
fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request = String::new();
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap();
            }
            request.push_str(&line);
        }

        let mut payload = vec![0; content_length];
        reader.read_exact(&mut payload).unwrap();

        write!(
            stream,
            "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .unwrap();

        request.push_str("\r\n");
        request.push_str(&String::from_utf8(payload).unwrap());
        request
    });

    (base_url, handle)
}

#[test]
fn raw_message_decodes_to_the_composed_email() {
    let raw = build_message(&simple_email()).unwrap();
    let decoded = decode(&raw);

    assert!(decoded.contains("Subject: Test\r\n"));
    assert!(decoded.contains("From: a@x.com\r\n"));
    assert!(decoded.contains("To: b@x.com\r\n"));
    assert!(decoded.contains("Hello"));
}

#[test]
fn empty_cc_and_bcc_are_present() {
    let decoded = decode(&build_message(&simple_email()).unwrap());

    assert!(decoded.contains("To: b@x.com\r\nCc:\r\nBcc:\r\n"));
}

#[test]
fn attachments_follow_the_body() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.xlsx");
    let photo = dir.path().join("photo.png");
    std::fs::write(&report, b"PK\x03\x04").unwrap();
    std::fs::write(&photo, [0x89, b'P', b'N', b'G']).unwrap();

    let email = simple_email()
        .with_cc(vec!["c@x.com".into(), "d@x.com".into()])
        .with_attachments(vec![report, photo]);
    let decoded = decode(&build_message(&email).unwrap());

    assert!(decoded.contains("Cc: c@x.com, d@x.com\r\n"));
    let body = decoded.find("Hello").unwrap();
    let xlsx = decoded.find("Content-Type: application/vnd-xls").unwrap();
    let png = decoded.find("Content-Type: image/png").unwrap();
    assert!(body < xlsx && xlsx < png);
}

#[test]
fn successful_send_calls_the_transport_once() {
    let transport = AcceptingTransport { calls: Cell::new(0) };
    let raw = build_message(&simple_email()).unwrap();

    let sent = send_email(&transport, &raw).unwrap();

    assert_eq!(sent.id, "18c1f0");
    assert_eq!(transport.calls.get(), 1);
}

#[test]
fn transport_failure_is_logged_and_wrapped_unchanged() {
    let transport = RejectingTransport { calls: Cell::new(0) };
    let raw = build_message(&simple_email()).unwrap();
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();

    let err = tracing::subscriber::with_default(subscriber, || send_email(&transport, &raw))
        .unwrap_err();

    assert_eq!(transport.calls.get(), 1);
    match err {
        Error::SendFailed {
            source: ApiError::Status { status, ref message },
        } => {
            assert_eq!(status, 403);
            assert_eq!(message, "Insufficient Permission");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let output = logs.contents();
    assert!(output.contains("ERROR"));
    assert!(output.contains("Insufficient Permission"));
}

#[test]
fn build_service_rejects_an_empty_token() {
    let credential = Credential {
        token: Token::new("", "Bearer"),
        client_id: "id.apps.googleusercontent.com".into(),
        client_secret: None,
        token_uri: "https://oauth2.googleapis.com/token".into(),
    };

    let err = build_service(&credential).unwrap_err();
    assert!(matches!(err, Error::InvalidCredential(_)));
}

#[test]
fn gmail_service_posts_raw_with_bearer_auth() {
    let (base_url, server) = serve_once(
        "HTTP/1.1 200 OK",
        r#"{"id":"18c1f0","threadId":"18c1ef","labelIds":["SENT"]}"#,
    );
    let service = GmailService::with_base_url("ya29.test-token", &base_url).unwrap();
    let raw = build_message(&simple_email()).unwrap();

    let sent = send_email(&service, &raw).unwrap();
    let request = server.join().unwrap();

    assert_eq!(sent.id, "18c1f0");
    assert_eq!(sent.thread_id.as_deref(), Some("18c1ef"));
    assert!(request.starts_with("POST /gmail/v1/users/me/messages/send HTTP/1.1\r\n"));
    assert!(request.to_ascii_lowercase().contains("authorization: bearer ya29.test-token"));

    let payload = request.split("\r\n\r\n").nth(1).unwrap();
    let body: RawMessage = serde_json::from_str(payload).unwrap();
    assert_eq!(body, raw);
}

#[test]
fn gmail_error_body_becomes_status_error() {
    let (base_url, server) = serve_once(
        "HTTP/1.1 403 Forbidden",
        r#"{"error":{"code":403,"message":"Insufficient Permission","status":"PERMISSION_DENIED"}}"#,
    );
    let service = GmailService::with_base_url("ya29.test-token", &base_url).unwrap();
    let raw = build_message(&simple_email()).unwrap();

    let err = send_email(&service, &raw).unwrap_err();
    server.join().unwrap();

    assert!(matches!(
        err,
        Error::SendFailed {
            source: ApiError::Status { status: 403, .. }
        }
    ));
    assert!(err.to_string().contains("Insufficient Permission"));
}
