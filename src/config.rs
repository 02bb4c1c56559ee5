//! Configuration and limits for client connections.

use std::time::Duration;

use crate::error::{DecodeError, HandshakeError};
use crate::protocol::MAX_CONTROL_FRAME_PAYLOAD;

/// Resource limits applied to data received from the server.
///
/// These bound allocation before a frame payload or handshake response is
/// read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum payload size of a single incoming frame in bytes.
    ///
    /// Default: 16 MB (16 * 1024 * 1024)
    pub max_frame_size: usize,

    /// Maximum size of the handshake response in bytes.
    ///
    /// Default: 8 KB (8192)
    pub max_handshake_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024, // 16 MB
            max_handshake_size: 8192,
        }
    }
}

impl Limits {
    /// Create new limits with custom values.
    #[must_use]
    pub const fn new(max_frame_size: usize, max_handshake_size: usize) -> Self {
        Self {
            max_frame_size,
            max_handshake_size,
        }
    }

    /// Create limits suitable for small embedded systems.
    ///
    /// - Max frame: 64 KB
    /// - Max handshake: 4 KB
    #[must_use]
    pub const fn embedded() -> Self {
        Self {
            max_frame_size: 64 * 1024,
            max_handshake_size: 4096,
        }
    }

    /// Create limits for unrestricted use.
    ///
    /// Warning: Use only with trusted servers.
    ///
    /// - Max frame: 1 GB (on 64-bit) or `usize::MAX` (on 32-bit)
    /// - Max handshake: 64 KB
    #[cfg(target_pointer_width = "64")]
    #[must_use]
    pub const fn unrestricted() -> Self {
        Self {
            max_frame_size: 1024 * 1024 * 1024, // 1 GB
            max_handshake_size: 64 * 1024,
        }
    }

    /// Create limits for unrestricted use (32-bit platforms).
    #[cfg(target_pointer_width = "32")]
    #[must_use]
    pub const fn unrestricted() -> Self {
        Self {
            max_frame_size: usize::MAX,
            max_handshake_size: 64 * 1024,
        }
    }

    /// Validate that an announced frame length is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::FrameTooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_frame_size(&self, size: u64) -> Result<(), DecodeError> {
        if size > self.max_frame_size as u64 {
            Err(DecodeError::FrameTooLarge {
                size,
                max: self.max_frame_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that handshake size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::TooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_handshake_size(&self, size: usize) -> Result<(), HandshakeError> {
        if size > self.max_handshake_size {
            Err(HandshakeError::TooLarge {
                size,
                max: self.max_handshake_size,
            })
        } else {
            Ok(())
        }
    }
}

/// Client connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Resource limits.
    pub limits: Limits,

    /// Upper bound on transport open plus handshake.
    ///
    /// Reads after the connection is open are never timed out.
    /// Default: None
    pub handshake_timeout: Option<Duration>,

    /// Check `Sec-WebSocket-Accept` against the request key.
    ///
    /// Default: false
    pub verify_accept_key: bool,

    /// Payload of frames sent by `send_ping`.
    ///
    /// Default: `b"ping..."`
    pub ping_payload: Vec<u8>,

    /// Payload of frames sent by `send_pong`.
    ///
    /// Default: `b"pong..."`
    pub pong_payload: Vec<u8>,

    /// Set `TCP_NODELAY` on plain and TLS sockets.
    ///
    /// Default: true
    pub tcp_nodelay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            handshake_timeout: None,
            verify_accept_key: false,
            ping_payload: b"ping...".to_vec(),
            pong_payload: b"pong...".to_vec(),
            tcp_nodelay: true,
        }
    }
}

impl Config {
    /// Create a new configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Bound connect plus handshake by `timeout`.
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Enable or disable the accept key check.
    #[must_use]
    pub fn with_verify_accept_key(mut self, verify: bool) -> Self {
        self.verify_accept_key = verify;
        self
    }

    /// Set the ping payload.
    ///
    /// Payloads over 125 bytes are rejected when the ping is sent.
    #[must_use]
    pub fn with_ping_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.ping_payload = payload.into();
        self
    }

    /// Set the pong payload.
    ///
    /// Payloads over 125 bytes are rejected when the pong is sent.
    #[must_use]
    pub fn with_pong_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.pong_payload = payload.into();
        self
    }

    /// Enable or disable `TCP_NODELAY`.
    #[must_use]
    pub fn with_tcp_nodelay(mut self, nodelay: bool) -> Self {
        self.tcp_nodelay = nodelay;
        self
    }

    /// Returns `true` if both control payloads fit in a control frame.
    #[must_use]
    pub fn control_payloads_valid(&self) -> bool {
        self.ping_payload.len() <= MAX_CONTROL_FRAME_PAYLOAD
            && self.pong_payload.len() <= MAX_CONTROL_FRAME_PAYLOAD
    }
}
