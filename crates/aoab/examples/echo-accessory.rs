//! Host and accessory in one process: the bridge echoes every frame back.
//!
//! Run with:
//!   cargo run --example echo-accessory
//!
//! The two halves can also run separately with the CLI:
//!   cargo run --features cli -- host /tmp/aoab-demo/acc0.sock --mode counter --count 5
//!   cargo run --features cli -- attach /tmp/aoab-demo --echo

use std::fs;
use std::thread;
use std::time::Duration;

use aoab::bridge::{AccessoryBridge, BridgeConfig, BridgeEvent, ChannelListener, HostSession};
use aoab::transport::{SocketDirProvider, UnixDomainSocket};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::temp_dir().join(format!("aoab-echo-{}", std::process::id()));
    fs::create_dir_all(&dir)?;
    let socket = UnixDomainSocket::bind(dir.join("acc0.sock"))?;
    eprintln!("Host listening on {}", socket.path().display());

    let host = thread::spawn(move || -> Result<(), aoab::bridge::BridgeError> {
        let mut session = HostSession::accept(&socket)?;
        for word in ["one", "two", "three"] {
            session.write(word.as_bytes())?;
            if let Some(frame) = session.read()? {
                eprintln!("Host got back {:?}", String::from_utf8_lossy(frame.payload()));
            }
        }
        session.close()
    });

    let provider =
        SocketDirProvider::new(&dir).with_read_timeout(Some(Duration::from_millis(100)));
    let (listener, events) = ChannelListener::channel();
    let bridge = AccessoryBridge::start(provider, listener, BridgeConfig::default())?;

    for event in events.iter() {
        match event {
            BridgeEvent::Frame(payload) => {
                eprintln!("Bridge received {} bytes", payload.len());
                bridge.send(&payload)?;
            }
            BridgeEvent::Shutdown => {
                eprintln!("Bridge shut down");
                break;
            }
        }
    }

    if let Ok(result) = host.join() {
        result?;
    }
    let _ = fs::remove_dir_all(&dir);
    Ok(())
}
