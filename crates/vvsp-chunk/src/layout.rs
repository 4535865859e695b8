//! Fixed-width wire structures.
//!
//! Fields are written in declared order with no padding. Integer fields are
//! little-endian. FourCC fields hold the big-endian packed value of their
//! characters and are written like any other `u32`, so the tag `VVSP`
//! appears on the wire as the bytes `P S V V`.
//!
//! ```text
//! ChunkHeader   ┌──────────────┬──────────────┐
//!   (8 bytes)   │ fourcc (u32) │ size (i32)   │  + size bytes of payload
//!               └──────────────┴──────────────┘
//!
//! StreamHeader  version, video_codec, video_width, video_height,
//!   (36 bytes)  frame_rate_num, frame_rate_den, audio_codec,
//!               audio_rate, audio_channels            (all u32)
//!
//! FrameHeader   frame_index (u32), flags (u32, bit0 = IDR)
//!   (8 bytes)
//! ```

use bytes::{Buf, BufMut};

use crate::error::{ChunkError, Result};
use crate::fourcc::FourCc;

/// Stream header version this client speaks.
pub const SUPPORTED_VERSION: u32 = 2;

/// Universal framing primitive: type tag plus payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub fourcc: FourCc,
    pub size: i32,
}

impl ChunkHeader {
    pub const SIZE: usize = 8;

    pub fn new(fourcc: FourCc, size: i32) -> Self {
        Self { fourcc, size }
    }

    /// Payload length, rejecting negative sizes.
    pub fn payload_len(&self) -> Result<usize> {
        usize::try_from(self.size).map_err(|_| ChunkError::InvalidSize(self.size))
    }

    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.fourcc.as_u32());
        dst.put_i32_le(self.size);
    }

    pub fn decode(src: &[u8]) -> Result<Self> {
        let mut src = ensure_len("chunk header", src, Self::SIZE)?;
        Ok(Self {
            fourcc: FourCc::from_u32(src.get_u32_le()),
            size: src.get_i32_le(),
        })
    }
}

/// Stream parameters sent once per connection as the payload of the `VVSP` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub version: u32,
    pub video_codec: FourCc,
    pub video_width: u32,
    pub video_height: u32,
    pub frame_rate_num: u32,
    pub frame_rate_den: u32,
    pub audio_codec: FourCc,
    pub audio_rate: u32,
    pub audio_channels: u32,
}

impl StreamHeader {
    pub const SIZE: usize = 36;

    /// Frames per second, or `None` when the denominator is zero.
    pub fn frame_rate(&self) -> Option<f64> {
        (self.frame_rate_den != 0)
            .then(|| f64::from(self.frame_rate_num) / f64::from(self.frame_rate_den))
    }

    pub fn is_supported_version(&self) -> bool {
        self.version == SUPPORTED_VERSION
    }

    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.version);
        dst.put_u32_le(self.video_codec.as_u32());
        dst.put_u32_le(self.video_width);
        dst.put_u32_le(self.video_height);
        dst.put_u32_le(self.frame_rate_num);
        dst.put_u32_le(self.frame_rate_den);
        dst.put_u32_le(self.audio_codec.as_u32());
        dst.put_u32_le(self.audio_rate);
        dst.put_u32_le(self.audio_channels);
    }

    /// Decode from a chunk payload. Bytes past the declared layout are ignored.
    pub fn decode(src: &[u8]) -> Result<Self> {
        let mut src = ensure_len("stream header", src, Self::SIZE)?;
        Ok(Self {
            version: src.get_u32_le(),
            video_codec: FourCc::from_u32(src.get_u32_le()),
            video_width: src.get_u32_le(),
            video_height: src.get_u32_le(),
            frame_rate_num: src.get_u32_le(),
            frame_rate_den: src.get_u32_le(),
            audio_codec: FourCc::from_u32(src.get_u32_le()),
            audio_rate: src.get_u32_le(),
            audio_channels: src.get_u32_le(),
        })
    }
}

/// Per-frame metadata carried by the `fhdr` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Monotonically increasing; gaps mean the host dropped frames.
    pub frame_index: u32,
    pub flags: u32,
}

impl FrameHeader {
    pub const SIZE: usize = 8;
    /// Key frame: a decoder can start cold here.
    pub const FLAG_IDR: u32 = 1;

    pub fn new(frame_index: u32, idr: bool) -> Self {
        Self {
            frame_index,
            flags: if idr { Self::FLAG_IDR } else { 0 },
        }
    }

    pub fn is_idr(&self) -> bool {
        self.flags & Self::FLAG_IDR != 0
    }

    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.frame_index);
        dst.put_u32_le(self.flags);
    }

    pub fn decode(src: &[u8]) -> Result<Self> {
        let mut src = ensure_len("frame header", src, Self::SIZE)?;
        Ok(Self {
            frame_index: src.get_u32_le(),
            flags: src.get_u32_le(),
        })
    }
}

fn ensure_len<'a>(what: &'static str, src: &'a [u8], needed: usize) -> Result<&'a [u8]> {
    if src.len() < needed {
        return Err(ChunkError::Truncated {
            what,
            needed,
            available: src.len(),
        });
    }
    Ok(&src[..needed])
}
