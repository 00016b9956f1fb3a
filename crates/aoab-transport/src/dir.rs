use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::trace;

use crate::error::{Result, TransportError};
use crate::stream::{SocketReader, SocketWriter};
use crate::traits::{AccessoryProvider, DuplexStream};
use crate::uds::UnixDomainSocket;

/// Treats every Unix socket in a directory as an attached accessory.
///
/// Candidates are listed in path order so "the first accessory" is
/// deterministic. Non-socket entries are ignored.
#[derive(Debug, Clone)]
pub struct SocketDirProvider {
    dir: PathBuf,
    read_timeout: Option<Duration>,
}

impl SocketDirProvider {
    /// Watch `dir` for accessory sockets.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            read_timeout: None,
        }
    }

    /// Apply a read timeout to every opened stream.
    ///
    /// A blocked read then returns `WouldBlock`/`TimedOut` periodically, which
    /// the bridge treats as "not ready" and uses to notice shutdown requests.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// The watched directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl AccessoryProvider for SocketDirProvider {
    type Handle = PathBuf;
    type Reader = SocketReader;
    type Writer = SocketWriter;

    fn list_candidates(&mut self) -> Result<Vec<PathBuf>> {
        let discovery_err = |source| TransportError::Discovery {
            path: self.dir.clone(),
            source,
        };

        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(discovery_err(err)),
        };

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(discovery_err)?;
            match entry.file_type() {
                Ok(file_type) if file_type.is_socket() => candidates.push(entry.path()),
                _ => {}
            }
        }
        candidates.sort();
        trace!(dir = ?self.dir, count = candidates.len(), "listed accessory candidates");
        Ok(candidates)
    }

    fn open(&mut self, handle: &PathBuf) -> Result<DuplexStream<SocketReader, SocketWriter>> {
        let stream = UnixDomainSocket::connect(handle)?;
        stream.set_read_timeout(self.read_timeout)?;
        stream.into_duplex()
    }
}
