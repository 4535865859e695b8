//! Chunk framing for the VVSP streaming protocol.
//!
//! Every unit on the wire is a chunk:
//! - A 4-byte FourCC type tag
//! - A 4-byte signed payload length
//! - Exactly that many payload bytes
//!
//! This crate holds the wire layout of the stream and frame headers, the
//! outbound command codec, and blocking readers/writers that never leave a
//! chunk half-consumed.

pub mod command;
pub mod error;
pub mod fourcc;
pub mod layout;
pub mod reader;
pub mod writer;

pub use command::{Command, MouseButtons, RateControl};
pub use error::{ChunkError, Result};
pub use fourcc::{
    FourCc, CODEC_H264, CODEC_HEVC, CODEC_PCM16LE, FRAME_AUDIO, FRAME_HEADER, FRAME_VIDEO, MAGIC,
};
pub use layout::{ChunkHeader, FrameHeader, StreamHeader, SUPPORTED_VERSION};
pub use reader::{Chunk, ChunkReader, DEFAULT_MAX_CHUNK_SIZE};
pub use writer::{write_fully, ChunkWriter};
