/// Errors returned by bridge and host-session operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] aoab_transport::TransportError),

    /// Frame-level error (including failed writes).
    #[error("frame error: {0}")]
    Frame(#[from] aoab_frame::FrameError),

    /// The payload length is outside `1..=65535`.
    #[error("invalid payload length {len} (must be 1..={max})", max = aoab_frame::MAX_PAYLOAD)]
    InvalidPayloadLength { len: usize },

    /// No accessory is attached yet.
    #[error("no accessory attached")]
    NotAttached,

    /// The bridge has shut down.
    #[error("bridge shut down")]
    ShutDown,

    /// The worker thread could not be started.
    #[error("failed to spawn bridge worker: {0}")]
    Spawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
