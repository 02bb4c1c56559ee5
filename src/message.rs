//! Decoded, application-visible messages.

use std::borrow::Cow;

use crate::error::DecodeError;
use crate::protocol::{Frame, OpCode};

/// One decoded frame, tagged by category.
///
/// Text payloads are not UTF-8 validated; use [`Message::as_text`] or
/// [`Message::to_text`] to view them as strings. The payload is owned and
/// never aliases decoder buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Message {
    /// A text message.
    Text(Vec<u8>),
    /// A binary message.
    Binary(Vec<u8>),
    /// A ping frame (control frame, payload <= 125 bytes).
    Ping(Vec<u8>),
    /// A pong frame (control frame, payload <= 125 bytes).
    Pong(Vec<u8>),
    /// A close frame; the payload is usually empty.
    Close(Vec<u8>),
}

impl Message {
    /// Create a text message.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Message::Text(s.into().into_bytes())
    }

    /// Create a binary message.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Message::Binary(data.into())
    }

    /// Categorise a received frame.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnsupportedOpcode`] for continuation frames,
    /// since fragmented messages are not reassembled.
    pub fn from_frame(frame: Frame) -> Result<Self, DecodeError> {
        let opcode = frame.opcode;
        let payload = frame.into_payload();
        match opcode {
            OpCode::Text => Ok(Message::Text(payload)),
            OpCode::Binary => Ok(Message::Binary(payload)),
            OpCode::Ping => Ok(Message::Ping(payload)),
            OpCode::Pong => Ok(Message::Pong(payload)),
            OpCode::Close => Ok(Message::Close(payload)),
            OpCode::Continuation => Err(DecodeError::UnsupportedOpcode(opcode)),
        }
    }

    /// Opcode this message is sent with.
    #[must_use]
    pub const fn opcode(&self) -> OpCode {
        match self {
            Message::Text(_) => OpCode::Text,
            Message::Binary(_) => OpCode::Binary,
            Message::Ping(_) => OpCode::Ping,
            Message::Pong(_) => OpCode::Pong,
            Message::Close(_) => OpCode::Close,
        }
    }

    /// Returns `true` for ping, pong and close.
    #[must_use]
    pub const fn is_control(&self) -> bool {
        self.opcode().is_control()
    }

    /// Returns `true` if this is a text message.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Message::Text(_))
    }

    /// Returns `true` if this is a binary message.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Message::Binary(_))
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            Message::Text(p)
            | Message::Binary(p)
            | Message::Ping(p)
            | Message::Pong(p)
            | Message::Close(p) => p,
        }
    }

    pub fn into_payload(self) -> Vec<u8> {
        match self {
            Message::Text(p)
            | Message::Binary(p)
            | Message::Ping(p)
            | Message::Pong(p)
            | Message::Close(p) => p,
        }
    }

    /// Payload as a string, with invalid UTF-8 replaced.
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.payload())
    }

    /// Payload as a string if it is valid UTF-8.
    pub fn to_text(&self) -> Option<&str> {
        std::str::from_utf8(self.payload()).ok()
    }

    /// Status code carried by a close payload, if present.
    #[must_use]
    pub fn close_code(&self) -> Option<u16> {
        match self {
            Message::Close(p) if p.len() >= 2 => Some(u16::from_be_bytes([p[0], p[1]])),
            _ => None,
        }
    }

    /// Get the payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload().len()
    }

    /// Check if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload().is_empty()
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::text(s)
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::text(s)
    }
}

impl From<Vec<u8>> for Message {
    fn from(data: Vec<u8>) -> Self {
        Message::Binary(data)
    }
}
