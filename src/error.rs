//! Error types for the WebSocket client engine.
//!
//! Every failure the engine can report is a variant of [`Error`]. Handshake
//! and frame decoding failures carry a nested enum so callers can match on the
//! precise cause without string inspection.

use thiserror::Error;

use crate::protocol::OpCode;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while connecting, sending, receiving or closing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// `connect()` was called on a connection that is not idle.
    #[error("Already connected")]
    AlreadyConnected,

    /// A send or close was attempted outside the `Open` state.
    #[error("Not connected")]
    NotConnected,

    /// `connect()` was called on a connection that has already been closed.
    ///
    /// A closed connection is never reopened; construct a new one instead.
    #[error("Connection already terminated")]
    Terminated,

    /// Socket or TLS failure.
    #[error("Transport error ({kind:?}): {message}")]
    Transport {
        /// Kind of the underlying I/O error.
        kind: std::io::ErrorKind,
        /// Message of the underlying error.
        message: String,
    },

    /// `wss` was requested but no TLS backend was compiled in.
    #[error("TLS support is not enabled (build with `tls-rustls` or `tls-native`)")]
    TlsUnavailable,

    /// TLS configuration or negotiation failure.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The opening handshake failed.
    #[error("Handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// An incoming frame could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The URL could not be parsed into an endpoint.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The URL scheme is neither `ws` nor `wss`.
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// A request header value contains CR or LF.
    #[error("Invalid value for header {header}: {reason}")]
    InvalidHeaderValue {
        /// Header name.
        header: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Control frame payload too large (>125 bytes).
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(usize),

    /// The transport open and handshake did not finish in time.
    #[error("Handshake timed out")]
    Timeout,
}

/// Reasons the server's upgrade response was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandshakeError {
    /// The server answered 404.
    #[error("404 not found")]
    NotFound,

    /// The server answered 407.
    #[error("proxy authentication not supported")]
    ProxyAuthUnsupported,

    /// Any status other than 101, 404 or 407.
    #[error("unexpected status code {0}")]
    UnexpectedStatus(u16),

    /// The status line has no status code at the expected offset.
    #[error("malformed status line: {0:?}")]
    MalformedStatusLine(String),

    /// A required response header is absent.
    #[error("missing header field in server handshake: {0}")]
    MissingHeader(&'static str),

    /// A required response header has the wrong value.
    #[error("invalid {name} header: {value:?}")]
    InvalidHeader {
        /// Header name.
        name: &'static str,
        /// Value sent by the server.
        value: String,
    },

    /// `Sec-WebSocket-Accept` does not match the key that was sent.
    #[error("Sec-WebSocket-Accept does not match the request key")]
    AcceptMismatch,

    /// The response exceeded the configured size before its blank line.
    #[error("response too large: {size} bytes (max: {max})")]
    TooLarge {
        /// Bytes read so far.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The stream ended before the blank line.
    #[error("connection closed during handshake")]
    UnexpectedEof,
}

/// Reasons an incoming frame was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// The opcode nibble is not a defined opcode.
    #[error("invalid opcode: {0:#x}")]
    InvalidOpcode(u8),

    /// A defined opcode this client does not handle.
    #[error("unsupported opcode: {0:?}")]
    UnsupportedOpcode(OpCode),

    /// The 64-bit length has its high bit set or does not fit in memory.
    #[error("payload length {0} overflows")]
    LengthOverflow(u64),

    /// The frame is larger than the configured limit.
    #[error("frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Announced payload length.
        size: u64,
        /// Configured maximum.
        max: usize,
    },

    /// Servers must not mask frames.
    #[error("server frame must not be masked")]
    MaskedServerFrame,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Transport {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl Error {
    /// Returns `true` if this error came from the underlying stream.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }
}
