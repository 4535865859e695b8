mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;
use vvsp_transport::{EndpointConfig, DEFAULT_PREFIX};

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "vvsp", version, about = "VVSP stream client")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        env = "VVSP_LOG_FORMAT",
        default_value = "text",
        global = true
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        env = "VVSP_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    log_level: LogLevel,

    /// Directory holding the output endpoints.
    #[arg(long, value_name = "DIR", env = "VVSP_ENDPOINT_DIR", global = true)]
    endpoint_dir: Option<PathBuf>,

    /// Endpoint name prefix.
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_PREFIX, global = true)]
    prefix: String,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn endpoint_config(&self) -> EndpointConfig {
        let config = match &self.endpoint_dir {
            Some(dir) => EndpointConfig::in_dir(dir),
            None => EndpointConfig::from_env(),
        };
        config.with_prefix(self.prefix.clone())
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let endpoint = cli.endpoint_config();
    let result = cmd::run(cli.command, &endpoint, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
