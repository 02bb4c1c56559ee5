//! Frame encoding and decoding (RFC 6455 Section 5.2).
//!
//! Only unfragmented frames are produced: FIN is always set on output. On
//! input the FIN and RSV bits are carried but not interpreted.

use bytes::{BufMut, BytesMut};

use crate::error::DecodeError;
use crate::protocol::OpCode;
use crate::protocol::mask::apply_mask_fast;

/// Maximum payload size for control frames (RFC 6455).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

/// Largest length representable in the 7-bit field.
const MAX_DIRECT_LEN: usize = 125;

/// Marker for a 16-bit extended length.
pub(crate) const LEN_MARKER_16: u8 = 126;

/// Marker for a 64-bit extended length.
pub(crate) const LEN_MARKER_64: u8 = 127;

/// How a payload length is represented on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthTier {
    /// Length fits in the 7-bit field.
    Direct(u8),
    /// Marker 126 followed by a 2-byte big-endian length.
    Extended16(u16),
    /// Marker 127 followed by an 8-byte big-endian length.
    Extended64(u64),
}

impl LengthTier {
    /// Pick the smallest representation for `len`.
    #[must_use]
    pub fn for_len(len: usize) -> Self {
        if len <= MAX_DIRECT_LEN {
            LengthTier::Direct(len as u8)
        } else if let Ok(short) = u16::try_from(len) {
            LengthTier::Extended16(short)
        } else {
            LengthTier::Extended64(len as u64)
        }
    }

    /// Value of the 7-bit length field.
    #[must_use]
    pub const fn marker(self) -> u8 {
        match self {
            LengthTier::Direct(len) => len,
            LengthTier::Extended16(_) => LEN_MARKER_16,
            LengthTier::Extended64(_) => LEN_MARKER_64,
        }
    }

    /// Number of extended length bytes following the length byte.
    #[must_use]
    pub const fn extended_size(self) -> usize {
        match self {
            LengthTier::Direct(_) => 0,
            LengthTier::Extended16(_) => 2,
            LengthTier::Extended64(_) => 8,
        }
    }
}

/// The first two header bytes, split into fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameHead {
    pub fin: bool,
    pub opcode: OpCode,
    pub masked: bool,
    /// The raw 7-bit length field (0-127).
    pub len_field: u8,
}

impl FrameHead {
    pub(crate) fn parse(byte0: u8, byte1: u8) -> Result<Self, DecodeError> {
        Ok(Self {
            fin: (byte0 & 0x80) != 0,
            opcode: OpCode::from_u8(byte0 & 0x0F)?,
            masked: (byte1 & 0x80) != 0,
            len_field: byte1 & 0x7F,
        })
    }
}

/// Check a 64-bit extended length: the high bit must be clear and the value
/// must be addressable.
pub(crate) fn check_len64(len: u64) -> Result<usize, DecodeError> {
    if len > i64::MAX as u64 {
        return Err(DecodeError::LengthOverflow(len));
    }
    usize::try_from(len).map_err(|_| DecodeError::LengthOverflow(len))
}

/// A single frame.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |                         Masking key (if present)              |
/// +---------------------------------------------------------------+
/// |                     Payload data                              |
/// +---------------------------------------------------------------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag. Always true for frames this client builds.
    pub fin: bool,
    /// Frame opcode.
    pub opcode: OpCode,
    /// Masking key read from the wire, if the mask bit was set.
    ///
    /// Decoding never demasks; see [`Frame::unmask`].
    pub mask: Option<[u8; 4]>,
    payload: Vec<u8>,
}

impl Frame {
    /// Create a final, unmasked frame.
    #[must_use]
    pub fn new(opcode: OpCode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            fin: true,
            opcode,
            mask: None,
            payload: payload.into(),
        }
    }

    /// Assemble a received frame from its parsed header.
    pub(crate) fn from_parts(head: FrameHead, mask: Option<[u8; 4]>, payload: Vec<u8>) -> Self {
        Self {
            fin: head.fin,
            opcode: head.opcode,
            mask,
            payload,
        }
    }

    /// Create a text frame.
    #[must_use]
    pub fn text(data: impl Into<Vec<u8>>) -> Self {
        Self::new(OpCode::Text, data)
    }

    /// Create an empty close frame.
    #[must_use]
    pub fn close() -> Self {
        Self::new(OpCode::Close, Vec::new())
    }

    /// Get the payload bytes as they were read or given.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Whether the mask bit was set on the wire.
    #[must_use]
    pub const fn is_masked(&self) -> bool {
        self.mask.is_some()
    }

    /// Undo masking in place and clear the key.
    pub fn unmask(&mut self) {
        if let Some(key) = self.mask.take() {
            apply_mask_fast(&mut self.payload, key);
        }
    }

    /// Number of bytes this frame occupies on the wire.
    #[must_use]
    pub fn wire_size(&self, masked: bool) -> usize {
        let tier = LengthTier::for_len(self.payload.len());
        let mask_size = if masked { 4 } else { 0 };
        2 + tier.extended_size() + mask_size + self.payload.len()
    }

    /// Append the encoded frame to `dst`.
    ///
    /// The FIN bit is always set. When `mask` is given the mask bit is set,
    /// the key follows the length, and the payload is XORed with it; the
    /// frame's own payload is left untouched.
    pub fn encode(&self, dst: &mut BytesMut, mask: Option<[u8; 4]>) {
        let tier = LengthTier::for_len(self.payload.len());
        let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };

        dst.reserve(self.wire_size(mask.is_some()));
        dst.put_u8(0x80 | self.opcode.as_u8());
        dst.put_u8(mask_bit | tier.marker());

        match tier {
            LengthTier::Direct(_) => {}
            LengthTier::Extended16(len) => dst.put_u16(len),
            LengthTier::Extended64(len) => dst.put_u64(len),
        }

        match mask {
            Some(key) => {
                dst.put_slice(&key);
                let start = dst.len();
                dst.put_slice(&self.payload);
                apply_mask_fast(&mut dst[start..], key);
            }
            None => dst.put_slice(&self.payload),
        }
    }

    /// Decode one frame from the front of `buf`.
    ///
    /// Returns `Ok(None)` when `buf` does not yet hold a whole frame, or the
    /// frame and the number of bytes it consumed.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::InvalidOpcode`] for an undefined opcode
    /// - [`DecodeError::LengthOverflow`] for a 64-bit length with the high bit set
    pub fn parse(buf: &[u8]) -> Result<Option<(Self, usize)>, DecodeError> {
        if buf.len() < 2 {
            return Ok(None);
        }
        let head = FrameHead::parse(buf[0], buf[1])?;

        let (payload_len, mut offset) = match head.len_field {
            LEN_MARKER_16 => {
                let Some(bytes) = buf.get(2..4) else {
                    return Ok(None);
                };
                (u16::from_be_bytes([bytes[0], bytes[1]]) as usize, 4)
            }
            LEN_MARKER_64 => {
                let Some(bytes) = buf.get(2..10) else {
                    return Ok(None);
                };
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                (check_len64(u64::from_be_bytes(raw))?, 10)
            }
            direct => (direct as usize, 2),
        };

        let mask = if head.masked {
            let Some(bytes) = buf.get(offset..offset + 4) else {
                return Ok(None);
            };
            offset += 4;
            Some([bytes[0], bytes[1], bytes[2], bytes[3]])
        } else {
            None
        };

        let Some(end) = offset.checked_add(payload_len) else {
            return Err(DecodeError::LengthOverflow(payload_len as u64));
        };
        let Some(payload) = buf.get(offset..end) else {
            return Ok(None);
        };

        Ok(Some((Frame::from_parts(head, mask, payload.to_vec()), end)))
    }
}
