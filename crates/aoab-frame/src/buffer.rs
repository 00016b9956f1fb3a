use std::fmt;
use std::io::{ErrorKind, Read};

use tracing::trace;

use crate::codec::{decode_len, HEADER_SIZE, MAX_PAYLOAD};
use crate::error::{FrameError, Result};

/// Outcome of one [`FrameBuffer::decode_from`] attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// A complete frame is buffered. [`FrameBuffer::size`] is its length;
    /// zero means the peer sent the close sentinel.
    Ready,
    /// Bytes arrived but the frame is not complete yet.
    NeedMore,
}

/// Fixed-capacity receive buffer holding at most one frame.
///
/// The buffer is allocated once (65535 bytes) and reused for every frame.
/// Decoding is resumable: each [`decode_from`](Self::decode_from) call issues
/// at most one read for the prefix and one for the payload, and keeps
/// whatever arrived, so a frame may trickle in across many attempts without
/// the prefix ever being read twice.
pub struct FrameBuffer {
    data: Box<[u8]>,
    prefix: [u8; HEADER_SIZE],
    prefix_filled: usize,
    size: usize,
    filled: usize,
}

impl FrameBuffer {
    /// Allocate an empty buffer.
    pub fn new() -> Self {
        Self {
            data: vec![0u8; MAX_PAYLOAD].into_boxed_slice(),
            prefix: [0; HEADER_SIZE],
            prefix_filled: 0,
            size: 0,
            filled: 0,
        }
    }

    /// Try to complete the current frame from `src`.
    ///
    /// Returns `Ok(Ready)` once the prefix and the whole payload are in,
    /// `Ok(NeedMore)` after a short read, and an error when a read fails
    /// (`Io`) or hits EOF (`ConnectionClosed`). Neither outcome discards
    /// bytes already buffered; callers simply try again later.
    pub fn decode_from<R: Read + ?Sized>(&mut self, src: &mut R) -> Result<DecodeStatus> {
        if self.is_ready() {
            return Ok(DecodeStatus::Ready);
        }

        if self.prefix_filled < HEADER_SIZE {
            let n = read_some(src, &mut self.prefix[self.prefix_filled..])?;
            self.prefix_filled += n;
            if self.prefix_filled < HEADER_SIZE {
                trace!(have = self.prefix_filled, "short read on length prefix");
                return Ok(DecodeStatus::NeedMore);
            }
            self.size = decode_len(self.prefix);
            if self.size == 0 {
                return Ok(DecodeStatus::Ready);
            }
        }

        let n = read_some(src, &mut self.data[self.filled..self.size])?;
        self.filled += n;
        if self.filled < self.size {
            trace!(have = self.filled, want = self.size, "short read on payload");
            return Ok(DecodeStatus::NeedMore);
        }
        Ok(DecodeStatus::Ready)
    }

    /// Whether a complete frame is buffered.
    pub fn is_ready(&self) -> bool {
        self.prefix_filled == HEADER_SIZE && self.filled == self.size
    }

    /// Whether the buffered frame is the close sentinel.
    pub fn is_close(&self) -> bool {
        self.prefix_filled == HEADER_SIZE && self.size == 0
    }

    /// Declared payload length of the current frame (0 when idle).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Payload bytes received so far; the whole payload once ready.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.filled]
    }

    /// Fixed capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Forget the current frame and get ready for the next one.
    pub fn reset(&mut self) {
        self.data[..self.filled].fill(0);
        self.prefix = [0; HEADER_SIZE];
        self.prefix_filled = 0;
        self.size = 0;
        self.filled = 0;
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("prefix_filled", &self.prefix_filled)
            .field("size", &self.size)
            .field("filled", &self.filled)
            .finish()
    }
}

/// One read into `buf`, retrying only on `Interrupted`.
fn read_some<R: Read + ?Sized>(src: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match src.read(buf) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => return Ok(n),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
}
