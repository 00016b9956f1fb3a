use std::sync::Arc;
use std::time::Duration;

use aoab_bridge::{AccessoryBridge, BridgeConfig, BridgeEvent, ChannelListener};
use aoab_transport::SocketDirProvider;
use tracing::{info, warn};

use crate::cmd::AttachArgs;
use crate::exit::{bridge_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: AttachArgs, format: OutputFormat) -> CliResult<i32> {
    let read_timeout = parse_duration(&args.read_timeout)?;
    let provider = SocketDirProvider::new(&args.dir).with_read_timeout(Some(read_timeout));
    let (listener, events) = ChannelListener::channel();

    let bridge = AccessoryBridge::start(provider, listener, BridgeConfig::default())
        .map_err(|err| bridge_error("bridge start failed", err))?;
    let bridge = Arc::new(bridge);
    info!(dir = %args.dir.display(), "waiting for accessory");

    let handle = Arc::clone(&bridge);
    ctrlc::set_handler(move || handle.shutdown()).map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })?;

    let mut received = 0usize;
    for event in events.iter() {
        let payload = match event {
            BridgeEvent::Frame(payload) => payload,
            BridgeEvent::Shutdown => break,
        };
        if args.count.is_some_and(|count| received >= count) {
            continue;
        }

        received = received.saturating_add(1);
        print_frame(&payload, "host", received, format);

        if args.echo {
            if let Err(err) = bridge.send(&payload) {
                warn!(error = %err, "echo failed");
            }
        }
        if args.count.is_some_and(|count| received >= count) {
            bridge.shutdown();
        }
    }

    info!(frames = received, "bridge shut down");
    Ok(SUCCESS)
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "s" => Ok(Duration::from_secs(value)),
        _ => Ok(Duration::from_millis(value)),
    }
}
