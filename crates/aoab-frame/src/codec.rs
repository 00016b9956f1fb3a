use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Length prefix: 2 bytes, big-endian, unsigned.
pub const HEADER_SIZE: usize = 2;

/// Largest payload the 16-bit prefix can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// The zero-length prefix a peer sends to close the link.
pub const CLOSE_SENTINEL: [u8; HEADER_SIZE] = [0x00, 0x00];

/// One unit read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// An application payload (never empty).
    Data(Bytes),
    /// The zero-length close sentinel.
    Close,
}

impl Frame {
    /// Build a data frame.
    pub fn data(payload: impl Into<Bytes>) -> Self {
        Self::Data(payload.into())
    }

    /// Payload bytes; empty for [`Frame::Close`].
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Data(payload) => payload.as_ref(),
            Self::Close => &[],
        }
    }

    /// Whether this is the close sentinel.
    pub fn is_close(&self) -> bool {
        matches!(self, Self::Close)
    }

    /// The total wire size of this frame (prefix + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload().len()
    }
}

/// Serialize a payload length into its 2-byte prefix.
///
/// Fails for 0 (reserved for the close sentinel) and for lengths that do not
/// fit in 16 bits.
pub fn encode_len(len: usize) -> Result<[u8; HEADER_SIZE]> {
    if len == 0 || len > MAX_PAYLOAD {
        return Err(FrameError::InvalidPayloadLength { len });
    }
    Ok([((len >> 8) & 0xff) as u8, (len & 0xff) as u8])
}

/// Parse a 2-byte prefix back into a payload length. Zero means "close".
pub fn decode_len(prefix: [u8; HEADER_SIZE]) -> usize {
    (usize::from(prefix[0]) << 8) | usize::from(prefix[1])
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────┬──────────────────────┐
/// │ Length (2B BE)   │ Payload              │
/// │ 1..=65535        │ (Length bytes)       │
/// └──────────────────┴──────────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let prefix = encode_len(payload.len())?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&prefix);
    dst.put_slice(payload);
    Ok(())
}

/// Append the close sentinel.
pub fn encode_close(dst: &mut BytesMut) {
    dst.put_slice(&CLOSE_SENTINEL);
}

/// Decode one frame from a buffer.
///
/// Returns `None` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. Every prefix is
/// valid, so decoding itself cannot fail.
pub fn decode_frame(src: &mut BytesMut) -> Option<Frame> {
    if src.len() < HEADER_SIZE {
        return None;
    }

    let len = decode_len([src[0], src[1]]);
    if len == 0 {
        src.advance(HEADER_SIZE);
        return Some(Frame::Close);
    }

    if src.len() < HEADER_SIZE + len {
        return None;
    }

    src.advance(HEADER_SIZE);
    Some(Frame::Data(src.split_to(len).freeze()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_big_endian() {
        assert_eq!(encode_len(300).unwrap(), [0x01, 0x2C]);
        assert_eq!(decode_len([0x01, 0x2C]), 300);
        assert_eq!(encode_len(1).unwrap(), [0x00, 0x01]);
        assert_eq!(encode_len(MAX_PAYLOAD).unwrap(), [0xFF, 0xFF]);
        assert_eq!(decode_len([0xFF, 0xFF]), MAX_PAYLOAD);
        assert_eq!(decode_len([0x80, 0x00]), 0x8000);
    }

    #[test]
    fn encode_rejects_zero_and_oversized() {
        assert!(matches!(
            encode_len(0),
            Err(FrameError::InvalidPayloadLength { len: 0 })
        ));
        assert!(matches!(
            encode_len(MAX_PAYLOAD + 1),
            Err(FrameError::InvalidPayloadLength { len: 65536 })
        ));

        let mut buf = BytesMut::new();
        assert!(encode_frame(b"", &mut buf).is_err());
        assert!(encode_frame(&vec![0u8; MAX_PAYLOAD + 1], &mut buf).is_err());
        assert!(buf.is_empty(), "rejected frames must not touch the buffer");
    }

    #[test]
    fn encode_decode_roundtrip() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello, accessory", &mut buf).unwrap();
        assert_eq!(&buf[..2], &[0x00, 0x10]);

        let frame = decode_frame(&mut buf).unwrap();
        assert_eq!(frame, Frame::data(&b"hello, accessory"[..]));
        assert!(buf.is_empty());
    }

    #[test]
    fn roundtrip_at_the_limits() {
        for len in [1usize, 255, 256, MAX_PAYLOAD] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let mut buf = BytesMut::new();
            encode_frame(&payload, &mut buf).unwrap();
            let frame = decode_frame(&mut buf).unwrap();
            assert_eq!(frame.payload(), payload.as_slice(), "len {len}");
        }
    }

    #[test]
    fn decode_incomplete_prefix() {
        let mut buf = BytesMut::from(&[0x01][..]);
        assert!(decode_frame(&mut buf).is_none());
        assert_eq!(buf.len(), 1, "partial prefix must stay buffered");
    }

    #[test]
    fn decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        assert!(decode_frame(&mut buf).is_none());
        assert_eq!(buf.len(), HEADER_SIZE + 2);
    }

    #[test]
    fn zero_prefix_decodes_as_close() {
        let mut buf = BytesMut::new();
        encode_close(&mut buf);
        assert_eq!(&buf[..], &CLOSE_SENTINEL);

        let frame = decode_frame(&mut buf).unwrap();
        assert!(frame.is_close());
        assert!(frame.payload().is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn back_to_back_frames_stay_separate() {
        let mut buf = BytesMut::new();
        encode_frame(b"first", &mut buf).unwrap();
        encode_frame(b"second", &mut buf).unwrap();
        encode_close(&mut buf);

        assert_eq!(decode_frame(&mut buf), Some(Frame::data(&b"first"[..])));
        assert_eq!(decode_frame(&mut buf), Some(Frame::data(&b"second"[..])));
        assert_eq!(decode_frame(&mut buf), Some(Frame::Close));
        assert_eq!(decode_frame(&mut buf), None);
    }

    #[test]
    fn frame_wire_size() {
        assert_eq!(Frame::data(&b"test"[..]).wire_size(), HEADER_SIZE + 4);
        assert_eq!(Frame::Close.wire_size(), HEADER_SIZE);
    }
}
