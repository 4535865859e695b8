use std::fmt;
use std::io;

use vvsp_chunk::ChunkError;
use vvsp_client::ClientError;
use vvsp_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::InvalidOutputIndex(_) => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::PathTooLong { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
    }
}

pub fn chunk_error(context: &str, err: ChunkError) -> CliError {
    match err {
        ChunkError::Io(source) => io_error(context, source),
        ChunkError::EndOfStream | ChunkError::Cancelled => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        ChunkError::InvalidSize(_)
        | ChunkError::TooLarge { .. }
        | ChunkError::UnexpectedChunk { .. }
        | ChunkError::Truncated { .. }
        | ChunkError::UnknownOpcode(_)
        | ChunkError::UnknownRateControl(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Transport(err) => transport_error(context, err),
        ClientError::Chunk(err) => chunk_error(context, err),
        ClientError::BadMagic(_) | ClientError::UnsupportedVersion { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use vvsp_chunk::{FRAME_AUDIO, FRAME_VIDEO};

    use super::*;

    #[test]
    fn protocol_violations_are_data_invalid() {
        let err = client_error(
            "stream failed",
            ClientError::Chunk(ChunkError::UnexpectedChunk {
                expected: FRAME_VIDEO,
                found: FRAME_AUDIO,
            }),
        );
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("stream failed: "));

        let err = client_error(
            "stream failed",
            ClientError::UnsupportedVersion {
                found: 1,
                supported: 2,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn bad_output_index_is_usage() {
        let err = transport_error("endpoint", TransportError::InvalidOutputIndex(26));
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn io_kinds_map_to_codes() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(
            transport_error("bind failed", TransportError::Io(denied)).code,
            PERMISSION_DENIED
        );
        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        assert_eq!(chunk_error("read", ChunkError::Io(timed_out)).code, TIMEOUT);
    }
}
