use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod attach;
pub mod host;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play the host: bind a socket and talk to one bridge.
    Host(HostArgs),
    /// Run the accessory bridge over a socket directory.
    Attach(AttachArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Host(args) => host::run(args, format),
        Command::Attach(args) => attach::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// How the host answers frames from the accessory.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum HostMode {
    /// Reply to an integer with its successor.
    #[default]
    Counter,
    /// Send every frame straight back.
    Echo,
}

#[derive(Args, Debug)]
pub struct HostArgs {
    /// Socket path to bind. The bridge finds it by its directory.
    pub path: PathBuf,
    /// Payload to send once the bridge connects (counter mode sends "0").
    #[arg(long)]
    pub initial: Option<String>,
    /// Reply strategy.
    #[arg(long, value_enum, default_value_t = HostMode::Counter)]
    pub mode: HostMode,
    /// Send the close frame after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct AttachArgs {
    /// Directory to watch for accessory sockets.
    pub dir: PathBuf,
    /// Send every received frame back to the host.
    #[arg(long)]
    pub echo: bool,
    /// Request shutdown after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Read timeout on the accessory stream (e.g. 250ms, 1s).
    #[arg(long, default_value = "250ms")]
    pub read_timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
