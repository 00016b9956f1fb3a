use std::io::{ErrorKind, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use crate::error::Result;
use crate::traits::{Close, DuplexStream};

/// A connected accessory socket. Implements `Read + Write`.
///
/// This is what [`UnixDomainSocket`](crate::UnixDomainSocket) hands out on
/// both ends. The bridge side splits it with [`SocketStream::into_duplex`].
pub struct SocketStream {
    inner: UnixStream,
}

impl Read for SocketStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for SocketStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl SocketStream {
    pub(crate) fn from_unix(stream: UnixStream) -> Self {
        Self { inner: stream }
    }

    /// Set read timeout on the underlying socket.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying socket.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self::from_unix(self.inner.try_clone()?))
    }

    /// Shut down both directions of the socket.
    pub fn shutdown(&self) -> Result<()> {
        self.inner.shutdown(Shutdown::Both).map_err(Into::into)
    }

    /// Split into read half, write half and a resource handle for the socket.
    ///
    /// Each part owns its own descriptor, so closing one leaves the others
    /// usable until they are closed too.
    pub fn into_duplex(self) -> Result<DuplexStream<SocketReader, SocketWriter>> {
        let reader = SocketReader(self.inner.try_clone()?);
        let writer = SocketWriter(self.inner.try_clone()?);
        Ok(DuplexStream::new(reader, writer).with_resource(SocketResource(self.inner)))
    }
}

impl From<UnixStream> for SocketStream {
    fn from(stream: UnixStream) -> Self {
        Self::from_unix(stream)
    }
}

impl std::fmt::Debug for SocketStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketStream").field("type", &"unix").finish()
    }
}

/// Read half of a split [`SocketStream`]. Closing shuts down the read direction.
#[derive(Debug)]
pub struct SocketReader(UnixStream);

impl Read for SocketReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

impl Close for SocketReader {
    fn close(&mut self) -> std::io::Result<()> {
        shutdown_once(&self.0, Shutdown::Read)
    }
}

/// Write half of a split [`SocketStream`]. Closing shuts down the write direction.
#[derive(Debug)]
pub struct SocketWriter(UnixStream);

impl Write for SocketWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl Close for SocketWriter {
    fn close(&mut self) -> std::io::Result<()> {
        shutdown_once(&self.0, Shutdown::Write)
    }
}

/// The socket backing both halves of a split [`SocketStream`].
#[derive(Debug)]
pub struct SocketResource(UnixStream);

impl Close for SocketResource {
    fn close(&mut self) -> std::io::Result<()> {
        shutdown_once(&self.0, Shutdown::Both)
    }
}

/// Shut a direction down. A socket that is already disconnected counts as
/// done.
fn shutdown_once(stream: &UnixStream, how: Shutdown) -> std::io::Result<()> {
    match stream.shutdown(how) {
        Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
        other => other,
    }
}
