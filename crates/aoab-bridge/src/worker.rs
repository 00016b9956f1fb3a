use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

use aoab_frame::{DecodeStatus, FrameBuffer, FrameError, FrameWriter};
use aoab_transport::{AccessoryProvider, Close, DuplexStream, Resource};
use tracing::{debug, info, trace, warn};

use crate::config::BridgeConfig;
use crate::listener::Listener;

/// Messages posted to the worker's control queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Shutdown,
}

/// Connection lifecycle. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    Detecting,
    Attached,
    ShuttingDown,
    ShutDown,
}

/// Work items the dispatch loop consumes, one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkItem {
    MaybeRead,
    Stop,
}

/// State shared between the worker and callers of `send`.
///
/// The write half lives here so callers can write from their own threads;
/// the mutex keeps concurrent frames from interleaving.
pub(crate) struct Shared<W> {
    writer: Mutex<Option<FrameWriter<W>>>,
    closed: AtomicBool,
}

impl<W> Shared<W> {
    pub(crate) fn new() -> Self {
        Self {
            writer: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Lock the write slot. A sender that panicked mid-write does not stop
    /// teardown from closing the stream.
    pub(crate) fn lock_writer(&self) -> MutexGuard<'_, Option<FrameWriter<W>>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the writer out of the slot unless a sender is holding it.
    /// `None` means the slot is busy.
    fn try_take_writer(&self) -> Option<Option<FrameWriter<W>>> {
        match self.writer.try_lock() {
            Ok(mut slot) => Some(slot.take()),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner().take()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// The single thread that owns an accessory connection end to end.
pub(crate) struct Worker<P: AccessoryProvider, L> {
    provider: P,
    listener: L,
    config: BridgeConfig,
    buffer: FrameBuffer,
    control: Receiver<Control>,
    shared: Arc<Shared<P::Writer>>,
    state: ConnectionState,
    reader: Option<P::Reader>,
    resource: Option<Resource>,
    read_failures: u32,
}

impl<P: AccessoryProvider, L: Listener> Worker<P, L> {
    pub(crate) fn new(
        provider: P,
        listener: L,
        config: BridgeConfig,
        control: Receiver<Control>,
        shared: Arc<Shared<P::Writer>>,
    ) -> Self {
        Self {
            provider,
            listener,
            config,
            buffer: FrameBuffer::new(),
            control,
            shared,
            state: ConnectionState::Detecting,
            reader: None,
            resource: None,
            read_failures: 0,
        }
    }

    /// Drive the connection from detection to shutdown, then notify the
    /// listener. Consumes the worker so everything it holds is released.
    pub(crate) fn run(mut self) -> ConnectionState {
        if self.detect() {
            self.dispatch();
        }
        self.teardown();
        self.shared.closed.store(true, Ordering::SeqCst);
        self.transition(ConnectionState::ShutDown);
        self.listener.on_shutdown();
        self.state
    }

    fn transition(&mut self, next: ConnectionState) {
        debug!(from = ?self.state, to = ?next, "bridge state change");
        self.state = next;
    }

    /// Poll the provider until an accessory opens. Returns `false` when
    /// shutdown was requested (or detection gave up) first.
    fn detect(&mut self) -> bool {
        let mut attempts = 0u32;
        loop {
            if self.stop_requested(self.config.connect_cooldown) {
                debug!("shutdown requested while detecting");
                return false;
            }
            attempts = attempts.saturating_add(1);

            let candidates = match self.provider.list_candidates() {
                Ok(candidates) => candidates,
                Err(err) => {
                    debug!(error = %err, "accessory discovery failed");
                    Vec::new()
                }
            };
            if candidates.len() > 1 {
                warn!(
                    count = candidates.len(),
                    "multiple accessories attached, trying first"
                );
            }

            if let Some(handle) = candidates.into_iter().next() {
                match self.provider.open(&handle) {
                    Ok(stream) => {
                        info!(?handle, "accessory attached");
                        self.attach(stream);
                        return true;
                    }
                    Err(err) => debug!(?handle, error = %err, "failed to open accessory"),
                }
            }

            if let Some(max) = self.config.max_detect_attempts {
                if attempts >= max {
                    warn!(attempts, "no accessory attached, giving up");
                    return false;
                }
            }
        }
    }

    fn attach(&mut self, stream: DuplexStream<P::Reader, P::Writer>) {
        let (reader, writer, resource) = stream.into_parts();
        self.reader = Some(reader);
        self.resource = resource;
        *self.shared.lock_writer() = Some(FrameWriter::new(writer));
        self.transition(ConnectionState::Attached);
    }

    /// Consume work items until the peer closes or shutdown is requested.
    fn dispatch(&mut self) {
        let mut delay = Duration::ZERO;
        loop {
            let item = if self.stop_requested(delay) {
                WorkItem::Stop
            } else {
                WorkItem::MaybeRead
            };

            match item {
                WorkItem::Stop => {
                    debug!("shutdown requested while attached");
                    return;
                }
                WorkItem::MaybeRead => match self.maybe_read() {
                    Some(next) => delay = next,
                    None => return,
                },
            }
        }
    }

    /// One decode attempt. Returns the delay before the next attempt, or
    /// `None` when the link should be torn down.
    fn maybe_read(&mut self) -> Option<Duration> {
        let reader = self.reader.as_mut()?;

        match self.buffer.decode_from(reader) {
            Ok(DecodeStatus::Ready) if self.buffer.is_close() => {
                info!("peer sent close frame");
                None
            }
            Ok(DecodeStatus::Ready) => {
                self.read_failures = 0;
                trace!(size = self.buffer.size(), "frame received");
                self.listener.on_frame(self.buffer.payload());
                self.buffer.reset();
                Some(Duration::ZERO)
            }
            Ok(DecodeStatus::NeedMore) => {
                self.read_failures = 0;
                Some(self.config.read_cooldown)
            }
            Err(err) if is_idle(&err) => Some(self.config.read_cooldown),
            Err(err) => {
                self.read_failures = self.read_failures.saturating_add(1);
                debug!(error = %err, failures = self.read_failures, "read not ready");
                match self.config.max_read_failures {
                    Some(max) if self.read_failures >= max => {
                        warn!(failures = self.read_failures, "read retries exhausted, closing");
                        None
                    }
                    _ => Some(self.config.read_cooldown),
                }
            }
        }
    }

    /// Close read half, write half and resource, each on its own. Skipped
    /// entirely when nothing was ever attached.
    ///
    /// A sender blocked mid-write holds the write slot; the resource is then
    /// closed first so the blocked write fails and releases it.
    fn teardown(&mut self) {
        if self.state != ConnectionState::Attached {
            return;
        }
        self.transition(ConnectionState::ShuttingDown);
        self.shared.closed.store(true, Ordering::SeqCst);

        if let Some(mut reader) = self.reader.take() {
            close_quietly("read half", &mut reader);
        }
        let writer = match self.shared.try_take_writer() {
            Some(writer) => writer,
            None => {
                debug!("sender busy, closing resource first");
                if let Some(mut resource) = self.resource.take() {
                    close_quietly("resource", &mut resource);
                }
                self.shared.lock_writer().take()
            }
        };
        if let Some(writer) = writer {
            close_quietly("write half", &mut writer.into_inner());
        }
        if let Some(mut resource) = self.resource.take() {
            close_quietly("resource", &mut resource);
        }
    }

    /// Wait up to `delay` for a control message. A dropped bridge handle
    /// counts as a shutdown request.
    fn stop_requested(&self, delay: Duration) -> bool {
        let message = if delay.is_zero() {
            match self.control.try_recv() {
                Ok(message) => Some(message),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(Control::Shutdown),
            }
        } else {
            match self.control.recv_timeout(delay) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => Some(Control::Shutdown),
            }
        };
        matches!(message, Some(Control::Shutdown))
    }
}

/// A read timeout: no data yet, but nothing wrong with the link.
fn is_idle(err: &FrameError) -> bool {
    matches!(
        err,
        FrameError::Io(io)
            if matches!(io.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
    )
}

fn close_quietly<C: Close + ?Sized>(part: &'static str, target: &mut C) {
    if let Err(err) = target.close() {
        debug!(part, error = %err, "close failed during teardown");
    }
}
