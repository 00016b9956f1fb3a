//! Accessory discovery and duplex stream abstraction.
//!
//! This is the lowest layer of aoab. An [`AccessoryProvider`] lists candidate
//! accessories and opens one into a [`DuplexStream`]: a read half, a write
//! half and the resource backing them, each closable on its own.
//!
//! On Unix, [`SocketDirProvider`] treats Unix domain sockets in a directory
//! as attached accessories, and [`UnixDomainSocket`] is the host end that
//! creates them.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod dir;
#[cfg(unix)]
pub mod stream;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use traits::{AccessoryProvider, Close, DuplexStream, Resource};

#[cfg(unix)]
pub use dir::SocketDirProvider;
#[cfg(unix)]
pub use stream::{SocketReader, SocketResource, SocketStream, SocketWriter};
#[cfg(unix)]
pub use uds::UnixDomainSocket;
