use tracing::debug;
use vvsp_chunk::Command;
use vvsp_client::{ClientConfig, ClientHandle, RunOutcome, StreamClient, StreamEvent};
use vvsp_transport::EndpointConfig;

use crate::cmd::{parse_duration, WatchArgs};
use crate::exit::{client_error, io_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_event, OutputFormat};

pub fn run(args: WatchArgs, endpoint: &EndpointConfig, format: OutputFormat) -> CliResult<i32> {
    let config = ClientConfig {
        connect_timeout: parse_duration(&args.connect_timeout)?,
        ..ClientConfig::default()
    };
    let (client, events) = StreamClient::for_output(endpoint, args.output, config)
        .map_err(|err| client_error("client setup failed", err))?;
    let handle = client.handle();
    install_ctrlc_handler(handle.clone())?;

    let worker = client
        .spawn()
        .map_err(|err| io_error("client thread failed to start", err))?;

    let mut budget = FrameBudget::new(args.count);
    let mut failure = None;

    // Ends once the client loop exits and drops its sender, or once the
    // frame budget is spent. Events still queued after that are discarded.
    for event in &events {
        print_event(&event, format);
        match event {
            StreamEvent::Connected(_) if args.request_idr => {
                debug!("requesting IDR frame");
                handle.send(&Command::RequestIdr);
            }
            // Audio closes each frame pair.
            StreamEvent::AudioFrame(_) => {
                if budget.record_frame() {
                    debug!(frames = budget.seen, "frame count reached");
                    handle.cancel();
                    break;
                }
            }
            StreamEvent::Error(err) => failure = Some(err),
            _ => {}
        }
    }

    let outcome = worker
        .join()
        .map_err(|_| CliError::new(INTERNAL, "client thread panicked"))?;

    match (outcome, failure) {
        (RunOutcome::Stopped, _) => Ok(SUCCESS),
        (RunOutcome::Faulted, Some(err)) => Err(client_error("stream failed", err)),
        (RunOutcome::Faulted, None) => Err(CliError::new(FAILURE, "stream failed")),
    }
}

fn install_ctrlc_handler(handle: ClientHandle) -> CliResult<()> {
    ctrlc::set_handler(move || handle.cancel()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}

/// Optional cap on the number of complete frames to print.
#[derive(Debug)]
struct FrameBudget {
    limit: Option<usize>,
    seen: usize,
}

impl FrameBudget {
    fn new(limit: Option<usize>) -> Self {
        Self { limit, seen: 0 }
    }

    /// Count one frame. True once the limit has been reached.
    fn record_frame(&mut self) -> bool {
        self.seen = self.seen.saturating_add(1);
        self.limit.is_some_and(|limit| self.seen >= limit)
    }
}
