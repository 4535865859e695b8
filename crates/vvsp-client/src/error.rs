use vvsp_chunk::{ChunkError, FourCc, MAGIC};

/// Errors that end a client session.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error (connect, socket setup).
    #[error("transport error: {0}")]
    Transport(#[from] vvsp_transport::TransportError),

    /// Chunk-level error (I/O, framing, decoding).
    #[error("chunk error: {0}")]
    Chunk(#[from] ChunkError),

    /// The first chunk of the connection was not the stream header.
    #[error("bad stream magic '{0}' (expected '{magic}')", magic = MAGIC)]
    BadMagic(FourCc),

    /// The host speaks a stream header version this client does not.
    #[error("unsupported stream version {found} (supported {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// What the client loop does after a session ends with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The host closed the stream: reconnect and handshake again.
    Retry,
    /// Cancelled: stop without reporting an error.
    Stop,
    /// Anything else: report the error and stop for good.
    Fault,
}

impl ClientError {
    pub fn disposition(&self) -> Disposition {
        match self {
            ClientError::Chunk(ChunkError::EndOfStream) => Disposition::Retry,
            ClientError::Chunk(ChunkError::Cancelled) => Disposition::Stop,
            _ => Disposition::Fault,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
