use std::sync::mpsc;

use bytes::Bytes;

/// Application callbacks driven by the bridge worker.
///
/// Both methods run on the worker thread, one at a time and in stream order,
/// so implementations need no locking of their own to reason about
/// ordering. `on_shutdown` is called exactly once, after the stream has been
/// torn down; the listener is dropped right after.
pub trait Listener: Send + 'static {
    /// A frame arrived. `payload` is only valid for the duration of the call;
    /// copy it out to keep it.
    fn on_frame(&mut self, payload: &[u8]);

    /// The bridge has shut down. No further callbacks follow.
    fn on_shutdown(&mut self);
}

impl<L: Listener + ?Sized> Listener for Box<L> {
    fn on_frame(&mut self, payload: &[u8]) {
        (**self).on_frame(payload)
    }

    fn on_shutdown(&mut self) {
        (**self).on_shutdown()
    }
}

/// Lifecycle events forwarded by [`ChannelListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// A copy of a received payload.
    Frame(Bytes),
    /// The bridge has shut down; this is always the last event.
    Shutdown,
}

/// Listener that forwards every callback into an `mpsc` channel.
///
/// Useful when the application wants to consume frames on its own thread.
/// Events are dropped silently once the receiver is gone.
#[derive(Debug)]
pub struct ChannelListener {
    tx: mpsc::Sender<BridgeEvent>,
}

impl ChannelListener {
    /// Create a listener and the receiver its events arrive on.
    pub fn channel() -> (Self, mpsc::Receiver<BridgeEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl Listener for ChannelListener {
    fn on_frame(&mut self, payload: &[u8]) {
        let _ = self
            .tx
            .send(BridgeEvent::Frame(Bytes::copy_from_slice(payload)));
    }

    fn on_shutdown(&mut self) {
        let _ = self.tx.send(BridgeEvent::Shutdown);
    }
}
