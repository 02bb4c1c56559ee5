//! Client side of the HTTP Upgrade handshake (RFC 6455 Section 4).
//!
//! The request is built as plain bytes and the response is read line by line
//! from the same stream, before any framing starts.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tracing::trace;

use crate::config::Limits;
use crate::endpoint::Endpoint;
use crate::error::{Error, HandshakeError, Result};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Protocol version sent in `Sec-WebSocket-Version`.
pub const WS_VERSION: u8 = 13;

/// Header names the request always sets. Extra headers with these names are
/// ignored.
const RESERVED_HEADERS: [&str; 6] = [
    "host",
    "upgrade",
    "connection",
    "sec-websocket-key",
    "sec-websocket-version",
    "sec-websocket-protocol",
];

/// Validate that a header value does not contain CR or LF characters.
///
/// # Errors
/// Returns `Error::InvalidHeaderValue` if the value contains `\r` or `\n`.
pub fn validate_header_value(header_name: &str, value: &str) -> Result<()> {
    if value.contains('\r') || value.contains('\n') {
        return Err(Error::InvalidHeaderValue {
            header: header_name.to_string(),
            reason: "contains CR or LF characters".to_string(),
        });
    }
    Ok(())
}

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use wslink::protocol::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    let hash = hasher.finalize();
    BASE64.encode(hash)
}

/// Build the upgrade request for `endpoint` with the given
/// `Sec-WebSocket-Key`.
///
/// Headers are emitted in a fixed order: Host, Upgrade, Connection,
/// Sec-WebSocket-Key, Sec-WebSocket-Version, the optional
/// Sec-WebSocket-Protocol, then the endpoint's extra headers. An extra header
/// is skipped when its name (case-insensitively) was already written.
///
/// # Errors
/// Returns `Error::InvalidHeaderValue` if the path, the subprotocol, or any
/// extra header name or value contains CR or LF.
pub fn build_request(endpoint: &Endpoint, key: &str) -> Result<Vec<u8>> {
    validate_header_value("request target", endpoint.path())?;

    let mut buf = Vec::with_capacity(256);
    buf.extend_from_slice(format!("GET {} HTTP/1.1\r\n", endpoint.path()).as_bytes());
    buf.extend_from_slice(format!("Host: {}\r\n", endpoint.host_header()).as_bytes());
    buf.extend_from_slice(b"Upgrade: websocket\r\n");
    buf.extend_from_slice(b"Connection: Upgrade\r\n");
    buf.extend_from_slice(format!("Sec-WebSocket-Key: {}\r\n", key).as_bytes());
    buf.extend_from_slice(format!("Sec-WebSocket-Version: {}\r\n", WS_VERSION).as_bytes());

    if let Some(proto) = endpoint.subprotocol() {
        validate_header_value("Sec-WebSocket-Protocol", proto)?;
        buf.extend_from_slice(format!("Sec-WebSocket-Protocol: {}\r\n", proto).as_bytes());
    }

    let mut written: Vec<String> = Vec::new();
    for (name, value) in endpoint.headers() {
        let lower = name.trim().to_ascii_lowercase();
        if RESERVED_HEADERS.contains(&lower.as_str()) || written.contains(&lower) {
            trace!(header = %name, "skipping duplicate request header");
            continue;
        }
        validate_header_value(name, name)?;
        validate_header_value(name, value)?;
        buf.extend_from_slice(format!("{}: {}\r\n", name.trim(), value).as_bytes());
        written.push(lower);
    }

    buf.extend_from_slice(b"\r\n");
    Ok(buf)
}

/// Extract the status code at its fixed offset in `HTTP/1.1 NNN ...`.
fn parse_status(status_line: &str) -> std::result::Result<u16, HandshakeError> {
    status_line
        .get(9..12)
        .filter(|code| code.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| HandshakeError::MalformedStatusLine(status_line.to_string()))
}

/// Server's answer to the upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// The status line, e.g. `HTTP/1.1 101 Switching Protocols`.
    pub status_line: String,
    /// Status code taken from the status line.
    pub status: u16,
    /// Response headers in the order received, names as sent.
    pub headers: Vec<(String, String)>,
}

impl HandshakeResponse {
    /// Parse the status line and header lines (without their CRLF).
    ///
    /// Header lines are split on the first colon; lines without a colon are
    /// ignored. Parsing stops at the first empty line.
    ///
    /// # Errors
    /// Returns `HandshakeError::MalformedStatusLine` if the first line has no
    /// three-digit status code at offset 9, or `UnexpectedEof` if there are no
    /// lines at all.
    pub fn from_lines<'a, I>(lines: I) -> std::result::Result<Self, HandshakeError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut lines = lines.into_iter();
        let status_line = lines.next().ok_or(HandshakeError::UnexpectedEof)?;
        let status = parse_status(status_line)?;

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        Ok(Self {
            status_line: status_line.to_string(),
            status,
            headers,
        })
    }

    /// Parse a complete response held in memory.
    ///
    /// # Errors
    /// As [`HandshakeResponse::from_lines`].
    pub fn parse(data: &[u8]) -> std::result::Result<Self, HandshakeError> {
        let text = String::from_utf8_lossy(data);
        Self::from_lines(text.split("\r\n"))
    }

    /// First value of the header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Subprotocol selected by the server, if any.
    pub fn protocol(&self) -> Option<&str> {
        self.header("Sec-WebSocket-Protocol")
    }

    /// Check that the response accepts the upgrade.
    ///
    /// Status 101 is required; 404 and 407 map to dedicated errors. `Upgrade`
    /// must equal `websocket` and `Connection` must equal `upgrade`, both
    /// case-insensitively. When `verify_accept` is set, `Sec-WebSocket-Accept`
    /// must match [`compute_accept_key`] of `key`.
    ///
    /// # Errors
    /// Returns the first [`HandshakeError`] found, checked in the order above.
    pub fn validate(
        &self,
        key: &str,
        verify_accept: bool,
    ) -> std::result::Result<(), HandshakeError> {
        match self.status {
            101 => {}
            404 => return Err(HandshakeError::NotFound),
            407 => return Err(HandshakeError::ProxyAuthUnsupported),
            other => return Err(HandshakeError::UnexpectedStatus(other)),
        }

        let upgrade = self
            .header("Upgrade")
            .ok_or(HandshakeError::MissingHeader("Upgrade"))?;
        if !upgrade.eq_ignore_ascii_case("websocket") {
            return Err(HandshakeError::InvalidHeader {
                name: "Upgrade",
                value: upgrade.to_string(),
            });
        }

        let connection = self
            .header("Connection")
            .ok_or(HandshakeError::MissingHeader("Connection"))?;
        if !connection.eq_ignore_ascii_case("upgrade") {
            return Err(HandshakeError::InvalidHeader {
                name: "Connection",
                value: connection.to_string(),
            });
        }

        if verify_accept {
            let accept = self
                .header("Sec-WebSocket-Accept")
                .ok_or(HandshakeError::MissingHeader("Sec-WebSocket-Accept"))?;
            if accept != compute_accept_key(key) {
                return Err(HandshakeError::AcceptMismatch);
            }
        }

        Ok(())
    }
}

/// Read response lines up to and including the blank line.
///
/// Bytes after the blank line stay buffered in `reader` for the frame decoder.
///
/// # Errors
/// - `HandshakeError::TooLarge` once more than `max_handshake_size` bytes
///   were read
/// - `HandshakeError::UnexpectedEof` if the stream ends first
/// - transport errors from the underlying read
pub async fn read_response<R>(reader: &mut R, limits: &Limits) -> Result<HandshakeResponse>
where
    R: AsyncBufRead + Unpin,
{
    let mut raw = Vec::with_capacity(256);
    loop {
        let start = raw.len();
        // One byte past the limit is enough to detect an oversized response.
        let budget = limits
            .max_handshake_size
            .saturating_add(1)
            .saturating_sub(start) as u64;
        let n = (&mut *reader)
            .take(budget)
            .read_until(b'\n', &mut raw)
            .await?;
        if n == 0 {
            return Err(HandshakeError::UnexpectedEof.into());
        }
        limits.check_handshake_size(raw.len())?;
        let line = &raw[start..];
        if line == b"\r\n" || line == b"\n" {
            break;
        }
    }

    let text = String::from_utf8_lossy(&raw);
    let response = HandshakeResponse::from_lines(text.lines())?;
    trace!(status = response.status, headers = response.headers.len(), "handshake response read");
    Ok(response)
}
