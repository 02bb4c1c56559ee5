//! WebSocket protocol core (RFC 6455 subset): frames, masking, handshake.
//!
//! Nothing in here performs I/O except [`handshake::read_response`].

pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;

pub use frame::{Frame, LengthTier, MAX_CONTROL_FRAME_PAYLOAD};
pub use handshake::{
    HandshakeResponse, WS_GUID, WS_VERSION, build_request, compute_accept_key, read_response,
};
pub use mask::{apply_mask, apply_mask_fast};
pub use opcode::OpCode;
