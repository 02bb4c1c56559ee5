//! Frame-level reading and writing over async streams.
//!
//! The read and write halves are driven separately: the receiver task owns a
//! [`FrameReader`], while senders share a [`FrameWriter`] behind the
//! connection lock.

mod framed;

pub use framed::{FrameReader, FrameWriter};
