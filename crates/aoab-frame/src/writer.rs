use std::io::{ErrorKind, Write};
use std::thread;
use std::time::Duration;

use bytes::BytesMut;

use crate::codec::{encode_close, encode_frame, HEADER_SIZE, MAX_PAYLOAD};
use crate::error::{FrameError, Result};

/// Pause before retrying a write the stream could not take yet.
const WOULD_BLOCK_BACKOFF: Duration = Duration::from_millis(1);

/// Writes complete frames to any `Write` stream.
///
/// Each call writes prefix and payload from one contiguous buffer and then
/// flushes. A failed write leaves the stream in an unknown state; nothing is
/// retried beyond `Interrupted`/`WouldBlock`.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(HEADER_SIZE + MAX_PAYLOAD),
        }
    }

    /// Encode and send one payload (blocking).
    ///
    /// The payload must be `1..=65535` bytes long.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(payload, &mut self.buf)?;
        self.write_buffered()
    }

    /// Send the zero-length close sentinel (blocking).
    pub fn send_close(&mut self) -> Result<()> {
        self.buf.clear();
        encode_close(&mut self.buf);
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(WOULD_BLOCK_BACKOFF)
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(WOULD_BLOCK_BACKOFF)
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> std::fmt::Debug for FrameWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::codec::{decode_frame, Frame, CLOSE_SENTINEL};

    #[test]
    fn writes_prefix_then_payload() {
        let mut writer = FrameWriter::new(Vec::new());
        writer.send(&[0xEE; 300]).unwrap();

        let wire = writer.into_inner();
        assert_eq!(&wire[..2], &[0x01, 0x2C]);
        assert_eq!(wire.len(), 302);
        assert!(wire[2..].iter().all(|&b| b == 0xEE));
    }

    #[test]
    fn multiple_frames_decode_in_order() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(b"one").unwrap();
        writer.send(b"two").unwrap();
        writer.send(b"three").unwrap();

        let mut wire = BytesMut::from(writer.into_inner().into_inner().as_slice());
        assert_eq!(decode_frame(&mut wire), Some(Frame::data(&b"one"[..])));
        assert_eq!(decode_frame(&mut wire), Some(Frame::data(&b"two"[..])));
        assert_eq!(decode_frame(&mut wire), Some(Frame::data(&b"three"[..])));
        assert!(wire.is_empty());
    }

    #[test]
    fn invalid_lengths_rejected_before_writing() {
        let mut writer = FrameWriter::new(Vec::new());

        let err = writer.send(b"").unwrap_err();
        assert!(matches!(err, FrameError::InvalidPayloadLength { len: 0 }));
        let err = writer.send(&vec![0u8; MAX_PAYLOAD + 1]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidPayloadLength { .. }));

        assert!(writer.into_inner().is_empty());
    }

    #[test]
    fn send_close_writes_sentinel() {
        let mut writer = FrameWriter::new(Vec::new());
        writer.send(b"bye").unwrap();
        writer.send_close().unwrap();

        let wire = writer.into_inner();
        assert_eq!(&wire[wire.len() - 2..], &CLOSE_SENTINEL);
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send(b"x").unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn short_writes_are_completed() {
        let mut writer = FrameWriter::new(OneByteWriter::default());
        writer.send(b"trickle").unwrap();

        let mut wire = BytesMut::from(writer.into_inner().data.as_slice());
        assert_eq!(decode_frame(&mut wire), Some(Frame::data(&b"trickle"[..])));
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let mut writer = FrameWriter::new(InterruptedWriteThenFlush::default());
        writer.send(b"retry").unwrap();
        assert_eq!(writer.get_ref().data.len(), HEADER_SIZE + 5);
    }

    #[test]
    fn would_block_is_retried_after_backoff() {
        let mut writer = FrameWriter::new(BusyWriter::default());
        writer.send(b"later").unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.busy_writes, 0);
        assert_eq!(inner.busy_flushes, 0);
        let mut wire = BytesMut::from(inner.data.as_slice());
        assert_eq!(decode_frame(&mut wire), Some(Frame::data(&b"later"[..])));
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(b"x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn io_error_is_reported() {
        let mut writer = FrameWriter::new(BrokenPipeWriter);
        let err = writer.send(b"x").unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn writes_over_socket_pair() {
        use std::io::Read;

        let (left, mut right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = FrameWriter::new(left);
        writer.send(b"ping").unwrap();

        let mut buf = [0u8; 6];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"\x00\x04ping");
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct OneByteWriter {
        data: Vec<u8>,
    }

    impl Write for OneByteWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.push(buf[0]);
            Ok(1)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    /// Refuses the first few writes and flushes with `WouldBlock`.
    struct BusyWriter {
        busy_writes: u8,
        busy_flushes: u8,
        data: Vec<u8>,
    }

    impl Default for BusyWriter {
        fn default() -> Self {
            Self {
                busy_writes: 3,
                busy_flushes: 2,
                data: Vec::new(),
            }
        }
    }

    impl Write for BusyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.busy_writes > 0 {
                self.busy_writes -= 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if self.busy_flushes > 0 {
                self.busy_flushes -= 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipeWriter;

    impl Write for BrokenPipeWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
