//! Accessory connection lifecycle.
//!
//! [`AccessoryBridge`] owns one worker thread that polls an
//! [`AccessoryProvider`](aoab_transport::AccessoryProvider) until an accessory
//! opens, decodes frames from it and hands each payload to a [`Listener`],
//! and tears the stream down when the peer sends the close frame or the
//! application asks to stop. Sends go straight to the write half from the
//! caller's thread.
//!
//! [`HostSession`] is the other end of the link: the host side that accepts
//! the bridge's connection and speaks the same framing.

pub mod bridge;
pub mod config;
pub mod error;
#[cfg(unix)]
pub mod host;
pub mod listener;

#[cfg(test)]
mod test_support;
mod worker;

pub use bridge::AccessoryBridge;
pub use config::{BridgeConfig, DEFAULT_CONNECT_COOLDOWN, DEFAULT_READ_COOLDOWN};
pub use error::{BridgeError, Result};
#[cfg(unix)]
pub use host::HostSession;
pub use listener::{BridgeEvent, ChannelListener, Listener};

/// Bridge over accessories found by [`SocketDirProvider`](aoab_transport::SocketDirProvider).
#[cfg(unix)]
pub type SocketBridge = AccessoryBridge<aoab_transport::SocketWriter>;
