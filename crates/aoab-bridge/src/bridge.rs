use std::io::Write;
use std::sync::{mpsc, Arc};
use std::thread;

use aoab_frame::MAX_PAYLOAD;
use aoab_transport::{AccessoryProvider, Close};
use tracing::debug;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::listener::Listener;
use crate::worker::{Control, Shared, Worker};

/// Handle to a running accessory bridge.
///
/// [`start`](Self::start) spawns one worker thread that detects an accessory,
/// delivers incoming frames to the [`Listener`] in order, and tears the
/// stream down when the peer sends the close frame or
/// [`shutdown`](Self::shutdown) is called. The handle itself only sends:
/// any thread may call [`send`](Self::send), and frames never interleave.
///
/// Dropping the handle requests shutdown.
pub struct AccessoryBridge<W> {
    shared: Arc<Shared<W>>,
    control: mpsc::Sender<Control>,
}

impl<W: Write + Close + Send + 'static> AccessoryBridge<W> {
    /// Start detecting accessories from `provider` on a new worker thread.
    ///
    /// Returns as soon as the worker is running. Detection keeps polling
    /// (every `connect_cooldown`) until an accessory opens or shutdown is
    /// requested.
    pub fn start<P, L>(provider: P, listener: L, config: BridgeConfig) -> Result<Self>
    where
        P: AccessoryProvider<Writer = W>,
        L: Listener,
    {
        let (control, control_rx) = mpsc::channel();
        let shared = Arc::new(Shared::new());
        let name = config.worker_name.clone();
        let worker = Worker::new(provider, listener, config, control_rx, Arc::clone(&shared));

        thread::Builder::new()
            .name(name)
            .spawn(move || {
                worker.run();
            })
            .map_err(BridgeError::Spawn)?;

        Ok(Self { shared, control })
    }

    /// Send one payload to the accessory (blocking).
    ///
    /// The payload must be `1..=65535` bytes. Fails with
    /// [`BridgeError::NotAttached`] before an accessory is open and with
    /// [`BridgeError::ShutDown`] once the bridge has closed. Concurrent
    /// callers are serialized; each frame reaches the wire whole.
    pub fn send(&self, payload: &[u8]) -> Result<()> {
        if payload.is_empty() || payload.len() > MAX_PAYLOAD {
            return Err(BridgeError::InvalidPayloadLength {
                len: payload.len(),
            });
        }

        let mut slot = self.shared.lock_writer();
        if self.shared.is_closed() {
            return Err(BridgeError::ShutDown);
        }
        let writer = slot.as_mut().ok_or(BridgeError::NotAttached)?;
        writer.send(payload)?;
        Ok(())
    }
}

impl<W> AccessoryBridge<W> {
    /// Ask the worker to stop.
    ///
    /// Returns immediately. The worker notices the request between read
    /// attempts, tears the stream down and then calls
    /// [`Listener::on_shutdown`]. Calling this more than once is harmless.
    pub fn shutdown(&self) {
        if self.control.send(Control::Shutdown).is_err() {
            debug!("bridge worker already gone");
        }
    }
}

impl<W> Drop for AccessoryBridge<W> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<W> std::fmt::Debug for AccessoryBridge<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessoryBridge")
            .field("shut_down", &self.shared.is_closed())
            .finish_non_exhaustive()
    }
}
