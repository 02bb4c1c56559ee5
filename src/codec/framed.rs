use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Limits;
use crate::entropy::Entropy;
use crate::error::Result;
use crate::protocol::Frame;
use crate::protocol::frame::{FrameHead, LEN_MARKER_16, LEN_MARKER_64, check_len64};

/// Write buffers above this size are released after use.
const RETAINED_WRITE_CAPACITY: usize = 64 * 1024;

/// Decodes frames from the read half of a stream.
///
/// Each call consumes exactly one frame, waiting across partial reads until
/// the whole frame has arrived.
pub struct FrameReader<R> {
    io: R,
    limits: Limits,
}

impl<R> FrameReader<R> {
    #[must_use]
    pub fn new(io: R, limits: Limits) -> Self {
        Self { io, limits }
    }

    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    #[must_use]
    pub fn into_inner(self) -> R {
        self.io
    }
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Read the next frame.
    ///
    /// The mask key is read when the mask bit is set, but the payload is
    /// returned as received.
    ///
    /// # Errors
    ///
    /// - [`DecodeError`](crate::DecodeError) for an invalid opcode, an
    ///   overflowing length, or a frame over `max_frame_size`
    /// - [`Error::Transport`](crate::Error::Transport) if the stream fails or
    ///   ends mid-frame
    pub async fn read_frame(&mut self) -> Result<Frame> {
        let byte0 = self.io.read_u8().await?;
        let byte1 = self.io.read_u8().await?;
        let head = FrameHead::parse(byte0, byte1)?;

        let len = match head.len_field {
            LEN_MARKER_16 => u64::from(self.io.read_u16().await?),
            LEN_MARKER_64 => self.io.read_u64().await?,
            direct => u64::from(direct),
        };
        let len = check_len64(len)?;
        self.limits.check_frame_size(len as u64)?;

        let mask = if head.masked {
            let mut key = [0u8; 4];
            self.io.read_exact(&mut key).await?;
            Some(key)
        } else {
            None
        };

        let mut payload = vec![0u8; len];
        self.io.read_exact(&mut payload).await?;

        Ok(Frame::from_parts(head, mask, payload))
    }
}

/// Encodes masked frames onto the write half of a stream.
pub struct FrameWriter<W> {
    io: W,
    buf: BytesMut,
    entropy: Arc<Entropy>,
}

impl<W> FrameWriter<W> {
    #[must_use]
    pub fn new(io: W, entropy: Arc<Entropy>) -> Self {
        Self {
            io,
            buf: BytesMut::with_capacity(1024),
            entropy,
        }
    }

    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.io
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.io
    }
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Mask `frame` with a fresh key and write it as one buffer, then flush.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) if the write or
    /// flush fails.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let mask = self.entropy.mask_key();
        self.buf.clear();
        frame.encode(&mut self.buf, Some(mask));

        let result = self.write_buffered().await;
        if self.buf.capacity() > RETAINED_WRITE_CAPACITY {
            self.buf = BytesMut::with_capacity(1024);
        }
        result
    }

    async fn write_buffered(&mut self) -> Result<()> {
        self.io.write_all(&self.buf).await?;
        self.io.flush().await?;
        Ok(())
    }

    /// Shut down the write side of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) if shutdown fails.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.io.shutdown().await?;
        Ok(())
    }
}
