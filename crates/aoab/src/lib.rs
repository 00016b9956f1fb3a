//! Framed duplex bridge for accessory links.
//!
//! aoab carries length-prefixed frames over a duplex byte stream between a
//! host and an accessory, and manages the accessory side's connection
//! lifecycle: detect, attach, dispatch frames, shut down.
//!
//! # Crate Structure
//!
//! - [`transport`]: accessory discovery and the duplex stream abstraction
//! - [`frame`]: 2-byte length-prefixed framing and the resumable receive buffer
//! - [`bridge`]: the accessory bridge worker, listener contract and host session

/// Re-export transport types.
pub mod transport {
    pub use aoab_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use aoab_frame::*;
}

/// Re-export bridge types.
pub mod bridge {
    pub use aoab_bridge::*;
}
