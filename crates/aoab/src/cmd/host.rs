use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aoab_bridge::{BridgeError, HostSession};
use aoab_frame::FrameError;
use aoab_transport::UnixDomainSocket;
use tracing::info;

use crate::cmd::{HostArgs, HostMode};
use crate::exit::{bridge_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

/// How often the receive loop checks for Ctrl-C.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub fn run(args: HostArgs, format: OutputFormat) -> CliResult<i32> {
    let socket =
        UnixDomainSocket::bind(&args.path).map_err(|err| transport_error("bind failed", err))?;
    info!(path = %socket.path().display(), "waiting for bridge");

    let mut session =
        HostSession::accept(&socket).map_err(|err| bridge_error("accept failed", err))?;
    session
        .set_read_timeout(Some(POLL_INTERVAL))
        .map_err(|err| bridge_error("socket setup failed", err))?;
    info!("bridge connected");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let initial = args.initial.clone().or_else(|| match args.mode {
        HostMode::Counter => Some("0".to_string()),
        HostMode::Echo => None,
    });
    if let Some(initial) = initial {
        session
            .write(initial.as_bytes())
            .map_err(|err| bridge_error("send failed", err))?;
    }

    let mut received = 0usize;
    while running.load(Ordering::SeqCst) {
        let frame = match session.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(BridgeError::Frame(FrameError::ConnectionClosed)) => {
                info!("bridge disconnected");
                return Ok(SUCCESS);
            }
            Err(err) => return Err(bridge_error("receive failed", err)),
        };

        if frame.is_close() {
            info!("bridge closed the link");
            return Ok(SUCCESS);
        }

        received = received.saturating_add(1);
        print_frame(frame.payload(), "accessory", received, format);

        if args.count.is_some_and(|count| received >= count) {
            break;
        }

        if let Some(reply) = reply_for(args.mode, frame.payload()) {
            session
                .write(&reply)
                .map_err(|err| bridge_error("send failed", err))?;
        }
    }

    session
        .close()
        .map_err(|err| bridge_error("close failed", err))?;
    info!(frames = received, "sent close frame");
    Ok(SUCCESS)
}

fn reply_for(mode: HostMode, payload: &[u8]) -> Option<Vec<u8>> {
    match mode {
        HostMode::Echo => Some(payload.to_vec()),
        HostMode::Counter => {
            let value: u64 = std::str::from_utf8(payload).ok()?.trim().parse().ok()?;
            Some(value.wrapping_add(1).to_string().into_bytes())
        }
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
