use std::io::ErrorKind;
use std::time::Duration;

use aoab_frame::{Frame, FrameError, FrameReader, FrameWriter, MAX_PAYLOAD};
use aoab_transport::{SocketStream, UnixDomainSocket};
use tracing::debug;

use crate::error::{BridgeError, Result};

/// The host end of an accessory link.
///
/// Speaks the same wire format as the bridge from the other side: writes
/// frames, reads frames, and ends the session with the close frame.
#[derive(Debug)]
pub struct HostSession {
    reader: FrameReader<SocketStream>,
    writer: FrameWriter<SocketStream>,
}

impl HostSession {
    /// Wrap a connected stream.
    pub fn new(stream: SocketStream) -> Result<Self> {
        let reader_stream = stream.try_clone()?;
        Ok(Self {
            reader: FrameReader::new(reader_stream),
            writer: FrameWriter::new(stream),
        })
    }

    /// Wait for the bridge to connect to `socket`.
    pub fn accept(socket: &UnixDomainSocket) -> Result<Self> {
        Self::new(socket.accept()?)
    }

    /// Make [`read`](Self::read) give up after `timeout` without data.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send one payload (`1..=65535` bytes).
    pub fn write(&mut self, payload: &[u8]) -> Result<()> {
        if payload.is_empty() || payload.len() > MAX_PAYLOAD {
            return Err(BridgeError::InvalidPayloadLength {
                len: payload.len(),
            });
        }
        self.writer.send(payload)?;
        Ok(())
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` when the read timeout expires first. A partially
    /// received frame stays buffered for the next call.
    pub fn read(&mut self) -> Result<Option<Frame>> {
        match self.reader.read_frame() {
            Ok(frame) => Ok(Some(frame)),
            Err(FrameError::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Send the close frame and shut the socket down.
    pub fn close(mut self) -> Result<()> {
        self.writer.send_close()?;
        if let Err(err) = self.writer.get_ref().shutdown() {
            debug!(error = %err, "socket shutdown after close frame failed");
        }
        Ok(())
    }
}
