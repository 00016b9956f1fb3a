//! Two-byte length-prefixed framing for accessory links.
//!
//! Every message on the wire is:
//! - A 2-byte big-endian payload length (1..=65535)
//! - The payload bytes
//!
//! A zero length is the close sentinel: the sender is done and the link
//! should be torn down. [`FrameBuffer`] is the fixed-capacity, resumable
//! receive buffer used by the bridge worker; [`FrameReader`] and
//! [`FrameWriter`] are blocking helpers for either end of the link.

pub mod buffer;
pub mod codec;
#[cfg(feature = "async")]
pub mod codec_async;
pub mod error;
pub mod reader;
pub mod writer;

pub use buffer::{DecodeStatus, FrameBuffer};
pub use codec::{
    decode_frame, decode_len, encode_close, encode_frame, encode_len, Frame, CLOSE_SENTINEL,
    HEADER_SIZE, MAX_PAYLOAD,
};
#[cfg(feature = "async")]
pub use codec_async::AoabCodec;
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
