use std::sync::mpsc::RecvTimeoutError;
use std::time::Instant;

use vvsp_client::{ClientConfig, StreamClient, StreamEvent};
use vvsp_transport::EndpointConfig;

use crate::cmd::{parse_duration, InfoArgs};
use crate::exit::{client_error, io_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT};
use crate::output::{print_header, OutputFormat};

pub fn run(args: InfoArgs, endpoint: &EndpointConfig, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let config = ClientConfig {
        connect_timeout: timeout.min(ClientConfig::default().connect_timeout),
        ..ClientConfig::default()
    };
    let (client, events) = StreamClient::for_output(endpoint, args.output, config)
        .map_err(|err| client_error("client setup failed", err))?;
    let handle = client.handle();
    let worker = client
        .spawn()
        .map_err(|err| io_error("client thread failed to start", err))?;

    let deadline = Instant::now() + timeout;
    let result = loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(StreamEvent::Connected(header)) => break Ok(header),
            Ok(StreamEvent::Error(err)) => break Err(client_error("handshake failed", err)),
            Ok(_) => continue,
            Err(RecvTimeoutError::Timeout) => {
                break Err(CliError::new(
                    TIMEOUT,
                    format!("no host on output {} after {timeout:?}", args.output),
                ))
            }
            Err(RecvTimeoutError::Disconnected) => {
                break Err(CliError::new(INTERNAL, "client stopped unexpectedly"))
            }
        }
    };

    handle.cancel();
    let _ = worker.join();

    let header = result?;
    print_header(&header, format);
    Ok(SUCCESS)
}
