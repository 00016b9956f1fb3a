use std::fmt;
use std::io::{Read, Write};

use crate::error::Result;

/// A stream half or resource handle that can be released explicitly.
///
/// Closing must be idempotent: closing something that is already closed is
/// a no-op that returns `Ok(())`.
pub trait Close {
    /// Release the underlying resource.
    fn close(&mut self) -> std::io::Result<()>;
}

impl<T: Close + ?Sized> Close for Box<T> {
    fn close(&mut self) -> std::io::Result<()> {
        (**self).close()
    }
}

/// Boxed resource handle kept alive alongside the two stream halves.
pub type Resource = Box<dyn Close + Send>;

/// An opened accessory connection, split into independently owned halves.
///
/// The read half and the write half can live on different threads. The
/// optional resource is whatever backs both halves (a descriptor, a device
/// handle) and is closed last during teardown.
pub struct DuplexStream<R, W> {
    reader: R,
    writer: W,
    resource: Option<Resource>,
}

impl<R: Read, W: Write> DuplexStream<R, W> {
    /// Assemble a duplex stream from its two halves.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            resource: None,
        }
    }

    /// Attach the resource handle backing both halves.
    pub fn with_resource(mut self, resource: impl Close + Send + 'static) -> Self {
        self.resource = Some(Box::new(resource));
        self
    }

    /// Borrow the read half.
    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Borrow the write half.
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Split into read half, write half and resource handle.
    pub fn into_parts(self) -> (R, W, Option<Resource>) {
        (self.reader, self.writer, self.resource)
    }
}

impl<R, W> fmt::Debug for DuplexStream<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuplexStream")
            .field("resource", &self.resource.is_some())
            .finish_non_exhaustive()
    }
}

/// Discovers accessories and opens them into duplex byte streams.
///
/// Implementations are polled repeatedly from the bridge worker thread.
/// `list_candidates` may return an empty list; only the first candidate of a
/// non-empty list is ever opened.
pub trait AccessoryProvider: Send + 'static {
    /// Opaque reference to a not-yet-opened accessory.
    type Handle: fmt::Debug + Send;
    /// Read half of an opened accessory.
    type Reader: Read + Close + Send + 'static;
    /// Write half of an opened accessory.
    type Writer: Write + Close + Send + 'static;

    /// Enumerate accessories that are currently available.
    fn list_candidates(&mut self) -> Result<Vec<Self::Handle>>;

    /// Open a candidate into a duplex stream.
    fn open(&mut self, handle: &Self::Handle) -> Result<DuplexStream<Self::Reader, Self::Writer>>;
}
