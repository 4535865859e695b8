use crate::fourcc::FourCc;

/// Errors that can occur while reading, writing or decoding chunks.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The peer closed the stream.
    #[error("end of stream")]
    EndOfStream,

    /// The cancel token was raised while waiting on the stream.
    #[error("cancelled")]
    Cancelled,

    /// Any other I/O failure.
    #[error("chunk I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A chunk header declared a negative payload length.
    #[error("invalid chunk size {0}")]
    InvalidSize(i32),

    /// A chunk exceeds the configured maximum size.
    #[error("chunk too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },

    /// A specific chunk type was required but another arrived.
    #[error("unexpected chunk '{found}' (expected '{expected}')")]
    UnexpectedChunk { expected: FourCc, found: FourCc },

    /// A payload is shorter than the structure it carries.
    #[error("{what} truncated ({available} bytes, need {needed})")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// A command starts with an opcode this codec does not know.
    #[error("unknown command opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    /// A set-encode-parameters command carries an unknown mode.
    #[error("unknown rate control mode {0}")]
    UnknownRateControl(u32),
}

pub type Result<T> = std::result::Result<T, ChunkError>;
