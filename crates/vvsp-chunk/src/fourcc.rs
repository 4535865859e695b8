use std::fmt;

/// Stream header chunk tag, the first chunk of every connection.
pub const MAGIC: FourCc = FourCc::new(*b"VVSP");
/// Frame header chunk tag.
pub const FRAME_HEADER: FourCc = FourCc::new(*b"fhdr");
/// Video payload chunk tag.
pub const FRAME_VIDEO: FourCc = FourCc::new(*b"fvid");
/// Audio payload chunk tag.
pub const FRAME_AUDIO: FourCc = FourCc::new(*b"faud");

pub const CODEC_H264: FourCc = FourCc::new(*b"h264");
pub const CODEC_HEVC: FourCc = FourCc::new(*b"hevc");
/// Interleaved signed 16-bit little-endian PCM.
pub const CODEC_PCM16LE: FourCc = FourCc::new(*b"pc16");

/// Four ASCII characters packed into a `u32`, first character in the most
/// significant byte regardless of platform byte order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourCc(u32);

impl FourCc {
    pub const fn new(chars: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(chars))
    }

    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn to_chars(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl From<u32> for FourCc {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<FourCc> for u32 {
    fn from(value: FourCc) -> Self {
        value.0
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chars = self.to_chars();
        if chars.iter().all(|c| c.is_ascii_graphic() || *c == b' ') {
            chars.iter().try_for_each(|c| write!(f, "{}", *c as char))
        } else {
            write!(f, "0x{:08x}", self.0)
        }
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({self})")
    }
}
