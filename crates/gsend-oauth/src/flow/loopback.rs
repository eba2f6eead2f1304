//! Loopback redirect listener for the installed-app flow.
//!
//! Binds `127.0.0.1` on an OS-assigned port and blocks until the browser
//! is redirected back with `code` (or `error`) in the query string.
//! Waiting for the redirect has no overall timeout; each accepted
//! connection gets a short deadline to send its request line so an
//! idle preconnect cannot hold up the ones queued behind it.

use crate::error::{Error, Result};
use std::io::{BufRead, BufReader, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::time::Duration;
use tracing::debug;
use url::Url;

const SUCCESS_PAGE: &str = "The authentication flow has completed. You may close this window.";
const FAILURE_PAGE: &str = "Authentication failed. Return to the terminal for details.";

/// Read and write deadline for a single accepted connection.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(2);

/// One-shot HTTP listener receiving the authorization redirect.
#[derive(Debug)]
pub struct LoopbackServer {
    listener: TcpListener,
    port: u16,
}

impl LoopbackServer {
    /// Binds a listener on an ephemeral loopback port.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn bind() -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
        let port = listener.local_addr()?.port();
        debug!(port, "Bound loopback redirect listener");
        Ok(Self { listener, port })
    }

    /// Port the listener is bound to.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Redirect URI to register with the authorization request.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }

    /// Blocks until a request carrying `code` or `error` arrives.
    ///
    /// Requests without either (favicon fetches) are answered with 404 and
    /// ignored. A connection whose request line cannot be read within a
    /// short deadline is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error only if accepting on the listener fails.
    pub fn wait_for_callback(self) -> Result<CallbackParams> {
        loop {
            let (mut stream, peer) = self.listener.accept()?;
            debug!(%peer, "Accepted redirect connection");

            let request_line = match read_request_head(&stream) {
                Ok(line) => line,
                Err(e) => {
                    debug!(%peer, error = %e, "Dropping unreadable connection");
                    continue;
                }
            };

            let params = match CallbackParams::parse_request_line(&request_line) {
                Ok(params) if params.is_redirect() => params,
                _ => {
                    respond(&mut stream, "404 Not Found", "Not found");
                    continue;
                }
            };

            if params.code.is_some() {
                respond(&mut stream, "200 OK", SUCCESS_PAGE);
            } else {
                respond(&mut stream, "400 Bad Request", FAILURE_PAGE);
            }
            return Ok(params);
        }
    }
}

/// Reads the request line and drains the remaining header lines.
fn read_request_head(stream: &TcpStream) -> std::io::Result<String> {
    stream.set_read_timeout(Some(CONNECTION_TIMEOUT))?;
    stream.set_write_timeout(Some(CONNECTION_TIMEOUT))?;

    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    // The remaining headers are drained best-effort; the request line
    // already carries everything needed.
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) if line.trim().is_empty() => break,
            Ok(_) => {}
        }
    }
    Ok(request_line)
}

/// Best-effort reply; the browser closing early is not an error.
fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n<html><body><p>{body}</p></body></html>"
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

/// Query parameters from the authorization redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    /// Authorization code.
    pub code: Option<String>,
    /// Echoed `state`.
    pub state: Option<String>,
    /// Error code when consent was not granted.
    pub error: Option<String>,
}

impl CallbackParams {
    /// Parses an HTTP request line such as
    /// `GET /?state=s&code=4/0Ab&scope=... HTTP/1.1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the line has no request target.
    pub fn parse_request_line(line: &str) -> Result<Self> {
        let target = line
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| Error::Callback(format!("malformed request line: {}", line.trim())))?;

        let url = Url::parse("http://127.0.0.1")?.join(target)?;

        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => params.code = Some(value.into_owned()),
                "state" => params.state = Some(value.into_owned()),
                "error" => params.error = Some(value.into_owned()),
                _ => {}
            }
        }
        Ok(params)
    }

    /// Whether this request is the authorization redirect at all.
    #[must_use]
    pub const fn is_redirect(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }

    /// Returns the authorization code after checking `state`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] if the user declined,
    /// [`Error::StateMismatch`] if `state` differs, or [`Error::Callback`]
    /// for any other provider error or a missing code.
    pub fn into_code(self, expected_state: &str) -> Result<String> {
        match self.error.as_deref() {
            Some("access_denied") => return Err(Error::AccessDenied),
            Some(other) => return Err(Error::Callback(other.to_string())),
            None => {}
        }

        if self.state.as_deref() != Some(expected_state) {
            return Err(Error::StateMismatch);
        }

        self.code
            .ok_or_else(|| Error::Callback("no authorization code received".into()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_parse_code_and_state() {
        let params = CallbackParams::parse_request_line(
            "GET /?state=abc&code=4%2F0AbCd&scope=https%3A%2F%2Fmail.google.com%2F HTTP/1.1\r\n",
        )
        .unwrap();
        assert_eq!(params.code.as_deref(), Some("4/0AbCd"));
        assert_eq!(params.state.as_deref(), Some("abc"));
        assert!(params.is_redirect());
        assert_eq!(params.into_code("abc").unwrap(), "4/0AbCd");
    }

    #[test]
    fn test_state_mismatch_is_rejected() {
        let params = CallbackParams::parse_request_line("GET /?state=evil&code=c HTTP/1.1").unwrap();
        assert!(matches!(params.into_code("abc"), Err(Error::StateMismatch)));
    }

    #[test]
    fn test_access_denied() {
        let params =
            CallbackParams::parse_request_line("GET /?error=access_denied&state=abc HTTP/1.1")
                .unwrap();
        assert!(matches!(params.into_code("abc"), Err(Error::AccessDenied)));
    }

    #[test]
    fn test_favicon_is_not_a_redirect() {
        let params = CallbackParams::parse_request_line("GET /favicon.ico HTTP/1.1").unwrap();
        assert!(!params.is_redirect());
    }

    #[test]
    fn test_malformed_request_line() {
        assert!(CallbackParams::parse_request_line("").is_err());
    }

    #[test]
    fn test_server_skips_noise_and_returns_code() {
        let server = LoopbackServer::bind().unwrap();
        let port = server.port();
        assert!(server.redirect_uri().ends_with(&format!(":{port}/")));

        let handle = thread::spawn(move || server.wait_for_callback());

        let mut favicon = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
        favicon.write_all(b"GET /favicon.ico HTTP/1.1\r\n\r\n").unwrap();
        let mut reply = String::new();
        favicon.read_to_string(&mut reply).unwrap();
        assert!(reply.starts_with("HTTP/1.1 404"));

        let mut redirect = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
        redirect
            .write_all(b"GET /?state=s1&code=the-code HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n")
            .unwrap();
        let mut reply = String::new();
        redirect.read_to_string(&mut reply).unwrap();
        assert!(reply.starts_with("HTTP/1.1 200 OK"));

        let params = handle.join().unwrap().unwrap();
        assert_eq!(params.into_code("s1").unwrap(), "the-code");
    }

    fn spawn_server() -> (u16, mpsc::Receiver<Result<CallbackParams>>) {
        let server = LoopbackServer::bind().unwrap();
        let port = server.port();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(server.wait_for_callback());
        });
        (port, rx)
    }

    fn send_redirect(port: u16, request: &[u8]) -> String {
        let mut redirect = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
        redirect
            .set_read_timeout(Some(CONNECTION_TIMEOUT * 5))
            .unwrap();
        redirect.write_all(request).unwrap();
        let mut reply = String::new();
        redirect.read_to_string(&mut reply).unwrap();
        reply
    }

    #[test]
    fn test_idle_connection_does_not_block_the_redirect() {
        let (port, rx) = spawn_server();

        let _idle = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();

        let reply = send_redirect(port, b"GET /?state=s&code=c HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n");
        assert!(reply.starts_with("HTTP/1.1 200 OK"));

        let params = rx
            .recv_timeout(CONNECTION_TIMEOUT * 5)
            .unwrap()
            .unwrap();
        assert_eq!(params.into_code("s").unwrap(), "c");
    }

    #[test]
    fn test_garbage_connection_does_not_abort_the_flow() {
        let (port, rx) = spawn_server();

        let mut junk = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
        junk.write_all(&[0xff, 0xfe, 0x00, b'\n']).unwrap();
        drop(junk);

        let reply = send_redirect(port, b"GET /?state=s&code=c HTTP/1.1\r\n\r\n");
        assert!(reply.starts_with("HTTP/1.1 200 OK"));

        let params = rx
            .recv_timeout(CONNECTION_TIMEOUT * 5)
            .unwrap()
            .unwrap();
        assert_eq!(params.code.as_deref(), Some("c"));
    }
}
