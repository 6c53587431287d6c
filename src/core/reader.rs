//! Chunk accumulation over a connection's receive buffer.
//!
//! The transport delivers arbitrarily-chunked byte slices; [`FrameReader`]
//! owns the growable buffer, appends each chunk, and drains every complete
//! frame. The buffer is exclusively owned by one connection, so no locking
//! is involved anywhere in this path.

use bytes::BytesMut;

use crate::core::frame::{extract_frame, Frame};
use crate::error::Result;

/// Accumulates raw transport bytes and emits complete frames.
#[derive(Debug)]
pub struct FrameReader {
    buf: BytesMut,
    max_remaining_length: usize,
}

impl FrameReader {
    /// Create a reader with a cap on the declared remaining length of any
    /// single frame.
    pub fn new(max_remaining_length: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_remaining_length,
        }
    }

    /// Append an incoming chunk and return every frame it completes.
    ///
    /// Tolerates chunks smaller than one frame (returns an empty vec and
    /// retains the bytes), chunks carrying several frames plus a partial
    /// trailer (returns the full frames, retains the remainder), and a
    /// length field split across chunks.
    ///
    /// # Errors
    /// Propagates `MalformedLength` and `OversizedPacket`; after either, the
    /// connection must be dropped and this reader discarded with it.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Frame>> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(frame) = extract_frame(&mut self.buf, self.max_remaining_length)? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Bytes currently buffered but not yet forming a complete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}
