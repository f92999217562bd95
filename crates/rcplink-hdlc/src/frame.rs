//! Fixed-capacity output buffer for encoded frames.

use bytes::{BufMut, BytesMut};

use crate::error::{EncodeError, Result};
use crate::MAX_FRAME_SIZE;

/// Single-use output region with a write cursor and a hard capacity.
///
/// Transmit paths encode each frame into a fresh buffer and only hand
/// the bytes to the transport once the whole frame is in place, so a
/// failed encode never leaks a partial frame onto the wire.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl FrameBuffer {
    /// Creates a buffer sized for the largest supported frame.
    pub fn new() -> Self {
        Self::with_capacity(MAX_FRAME_SIZE)
    }

    /// Creates a buffer with an explicit capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends one byte. Fails without side effects when full.
    pub fn push(&mut self, byte: u8) -> Result<()> {
        if self.buf.len() == self.capacity {
            return Err(EncodeError::Overflow {
                capacity: self.capacity,
            });
        }
        self.buf.put_u8(byte);
        Ok(())
    }

    /// Space left before the buffer is full.
    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// The bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rewinds the write cursor to the start.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<[u8]> for FrameBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}
