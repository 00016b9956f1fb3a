use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_close, encode_frame, Frame};
use crate::error::FrameError;

/// `tokio_util` codec for the accessory wire format.
///
/// Decodes into [`Frame::Data`] and [`Frame::Close`]. Encodes either a
/// [`Frame`] or a raw payload (`Bytes` / `&[u8]`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AoabCodec;

impl AoabCodec {
    /// Create a new codec.
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for AoabCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        Ok(decode_frame(src))
    }
}

impl Encoder<Frame> for AoabCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        match item {
            Frame::Data(payload) => encode_frame(&payload, dst),
            Frame::Close => {
                encode_close(dst);
                Ok(())
            }
        }
    }
}

impl Encoder<Bytes> for AoabCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(&item, dst)
    }
}

impl Encoder<&[u8]> for AoabCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(item, dst)
    }
}
