//! Scripted accessory provider for exercising the worker without sockets.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aoab_transport::{AccessoryProvider, Close, DuplexStream, TransportError};

use crate::config::BridgeConfig;

pub(crate) type CloseLog = Arc<Mutex<Vec<String>>>;

/// One scripted outcome of a `read` call on the accessory.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Deliver bytes; whatever does not fit stays queued.
    Data(Vec<u8>),
    /// Fail like a read timeout.
    Idle,
    /// Report end of stream.
    Eof,
}

/// Handles a test keeps to feed and inspect an opened stream.
#[derive(Clone)]
pub(crate) struct Script {
    pub(crate) feed: Arc<Mutex<VecDeque<Step>>>,
    pub(crate) written: Arc<Mutex<Vec<u8>>>,
    stall: Arc<Stall>,
}

impl Script {
    pub(crate) fn push(&self, step: Step) {
        self.feed.lock().unwrap().push_back(step);
    }

    /// Make every later write block until the resource is closed, like a
    /// socket whose peer stopped reading.
    pub(crate) fn stall_writes(&self) {
        self.stall.armed.store(true, Ordering::SeqCst);
    }

    /// Whether a write is currently blocked.
    pub(crate) fn write_stalled(&self) -> bool {
        self.stall.waiting.load(Ordering::SeqCst)
    }
}

/// A full send buffer. Closing the resource cuts the link and fails the
/// blocked write.
#[derive(Default)]
struct Stall {
    armed: AtomicBool,
    waiting: AtomicBool,
    cut: AtomicBool,
}

pub(crate) fn fast_config() -> BridgeConfig {
    BridgeConfig {
        connect_cooldown: Duration::from_millis(2),
        read_cooldown: Duration::from_millis(2),
        ..BridgeConfig::default()
    }
}

/// Encode one data frame.
pub(crate) fn wire(payload: &[u8]) -> Vec<u8> {
    let mut out = (payload.len() as u16).to_be_bytes().to_vec();
    out.extend_from_slice(payload);
    out
}

pub(crate) struct MockProvider {
    candidates: Vec<String>,
    opens: Arc<Mutex<VecDeque<Option<Script>>>>,
    opened: Arc<Mutex<Vec<String>>>,
    polls: Arc<AtomicUsize>,
    failing_listings: usize,
    log: CloseLog,
    fail_close: bool,
}

impl MockProvider {
    pub(crate) fn new() -> Self {
        Self {
            candidates: Vec::new(),
            opens: Arc::default(),
            opened: Arc::default(),
            polls: Arc::default(),
            failing_listings: 0,
            log: Arc::default(),
            fail_close: false,
        }
    }

    pub(crate) fn with_candidates(mut self, names: &[&str]) -> Self {
        self.candidates = names.iter().map(|name| name.to_string()).collect();
        self
    }

    pub(crate) fn with_failing_closes(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub(crate) fn with_failing_listings(mut self, count: usize) -> Self {
        self.failing_listings = count;
        self
    }

    /// Queue a successful open whose reads follow `steps`.
    pub(crate) fn push_stream(&self, steps: Vec<Step>) -> Script {
        let script = Script {
            feed: Arc::new(Mutex::new(steps.into())),
            written: Arc::default(),
            stall: Arc::default(),
        };
        self.opens.lock().unwrap().push_back(Some(script.clone()));
        script
    }

    /// Queue an open that fails.
    pub(crate) fn push_open_failure(&self) {
        self.opens.lock().unwrap().push_back(None);
    }

    pub(crate) fn close_log(&self) -> CloseLog {
        Arc::clone(&self.log)
    }

    pub(crate) fn opened(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.opened)
    }

    pub(crate) fn poll_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.polls)
    }
}

impl AccessoryProvider for MockProvider {
    type Handle = String;
    type Reader = ScriptedReader;
    type Writer = RecordingWriter;

    fn list_candidates(&mut self) -> aoab_transport::Result<Vec<String>> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst);
        if poll < self.failing_listings {
            return Err(TransportError::Discovery {
                path: PathBuf::from("/mock"),
                source: std::io::Error::from(ErrorKind::PermissionDenied),
            });
        }
        Ok(self.candidates.clone())
    }

    fn open(
        &mut self,
        handle: &String,
    ) -> aoab_transport::Result<DuplexStream<ScriptedReader, RecordingWriter>> {
        self.opened.lock().unwrap().push(handle.clone());
        let Some(script) = self.opens.lock().unwrap().pop_front().flatten() else {
            return Err(TransportError::Connect {
                path: PathBuf::from(handle),
                source: std::io::Error::from(ErrorKind::ConnectionRefused),
            });
        };

        let part = |suffix: &str| Part {
            name: format!("{handle}:{suffix}"),
            log: Arc::clone(&self.log),
            fail_close: self.fail_close,
            closed: false,
            cuts: None,
        };
        let reader = ScriptedReader {
            feed: script.feed,
            part: part("reader"),
        };
        let writer = RecordingWriter {
            written: script.written,
            part: part("writer"),
            stall: Arc::clone(&script.stall),
        };
        let resource = Part {
            cuts: Some(script.stall),
            ..part("resource")
        };
        Ok(DuplexStream::new(reader, writer).with_resource(resource))
    }
}

/// Close bookkeeping shared by every mock part.
pub(crate) struct Part {
    name: String,
    log: CloseLog,
    fail_close: bool,
    closed: bool,
    cuts: Option<Arc<Stall>>,
}

impl Close for Part {
    fn close(&mut self) -> std::io::Result<()> {
        self.closed = true;
        if let Some(stall) = &self.cuts {
            stall.cut.store(true, Ordering::SeqCst);
        }
        self.log.lock().unwrap().push(self.name.clone());
        if self.fail_close {
            return Err(std::io::Error::other("scripted close failure"));
        }
        Ok(())
    }
}

pub(crate) struct ScriptedReader {
    feed: Arc<Mutex<VecDeque<Step>>>,
    part: Part,
}

impl Read for ScriptedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.part.closed {
            return Ok(0);
        }
        let mut feed = self.feed.lock().unwrap();
        match feed.pop_front() {
            Some(Step::Data(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    feed.push_front(Step::Data(bytes.split_off(n)));
                }
                Ok(n)
            }
            Some(Step::Eof) => Ok(0),
            Some(Step::Idle) | None => Err(std::io::Error::from(ErrorKind::WouldBlock)),
        }
    }
}

impl Close for ScriptedReader {
    fn close(&mut self) -> std::io::Result<()> {
        self.part.close()
    }
}

/// Records written bytes, a few at a time, so concurrent frames would
/// interleave without outside locking.
pub(crate) struct RecordingWriter {
    written: Arc<Mutex<Vec<u8>>>,
    part: Part,
    stall: Arc<Stall>,
}

impl Write for RecordingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.part.closed {
            return Err(std::io::Error::from(ErrorKind::BrokenPipe));
        }
        if self.stall.armed.load(Ordering::SeqCst) {
            self.stall.waiting.store(true, Ordering::SeqCst);
            while !self.stall.cut.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1));
            }
            return Err(std::io::Error::from(ErrorKind::BrokenPipe));
        }
        let n = buf.len().min(3);
        self.written.lock().unwrap().extend_from_slice(&buf[..n]);
        std::thread::yield_now();
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Close for RecordingWriter {
    fn close(&mut self) -> std::io::Result<()> {
        self.part.close()
    }
}
