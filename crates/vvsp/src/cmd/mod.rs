use std::time::Duration;

use clap::{Args, Subcommand};
use vvsp_transport::EndpointConfig;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod endpoint;
pub mod host;
pub mod info;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream from a host output and print each event.
    Watch(WatchArgs),
    /// Connect to a host output and print its stream header.
    Info(InfoArgs),
    /// Serve a synthetic stream on an output endpoint.
    Host(HostArgs),
    /// Print the endpoint path for an output index.
    Endpoint(EndpointArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, endpoint: &EndpointConfig, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Watch(args) => watch::run(args, endpoint, format),
        Command::Info(args) => info::run(args, endpoint, format),
        Command::Host(args) => host::run(args, endpoint),
        Command::Endpoint(args) => endpoint::run(args, endpoint, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Host output index (0 = A).
    pub output: u32,
    /// Exit after N complete frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Ask the host for an IDR frame after each handshake.
    #[arg(long)]
    pub request_idr: bool,
    /// How long each connect attempt waits for the host (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Host output index (0 = A).
    pub output: u32,
    /// Maximum time to wait for the host (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct HostArgs {
    /// Output index to serve (0 = A).
    pub output: u32,
    /// Advertised video width.
    #[arg(long, default_value = "1280")]
    pub width: u32,
    /// Advertised video height.
    #[arg(long, default_value = "720")]
    pub height: u32,
    /// Frames per second.
    #[arg(long, default_value = "30")]
    pub fps: u32,
    /// Close each session after N frames.
    #[arg(long)]
    pub frames: Option<u64>,
    /// Emit an IDR frame every N frames.
    #[arg(long, default_value = "30")]
    pub idr_interval: u32,
    /// Synthetic video payload size in bytes.
    #[arg(long, default_value = "1024")]
    pub video_bytes: usize,
    /// Exit after the first session ends.
    #[arg(long)]
    pub once: bool,
}

#[derive(Args, Debug)]
pub struct EndpointArgs {
    /// Host output index (0 = A).
    pub output: u32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `5s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
