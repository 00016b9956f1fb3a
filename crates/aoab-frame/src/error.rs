/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload length is outside `1..=65535`.
    ///
    /// Zero is reserved for the close sentinel and anything larger does not
    /// fit the 16-bit length prefix.
    #[error("invalid payload length {len} (must be 1..={max})", max = crate::codec::MAX_PAYLOAD)]
    InvalidPayloadLength { len: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reached EOF (or accepted no more bytes) mid-operation.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
