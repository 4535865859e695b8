use bytes::Bytes;
use vvsp_chunk::StreamHeader;

use crate::error::ClientError;

/// Notifications raised by the client loop, in wire order.
#[derive(Debug)]
pub enum StreamEvent {
    /// Handshake completed. Always precedes frame events of the session.
    Connected(StreamHeader),
    /// A streaming session ended (host closed it, or the client stopped).
    Disconnected,
    VideoFrame(VideoFrame),
    AudioFrame(AudioFrame),
    /// Terminal failure. Nothing follows it.
    Error(ClientError),
}

impl StreamEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Connected(_) => "connected",
            StreamEvent::Disconnected => "disconnected",
            StreamEvent::VideoFrame(_) => "video",
            StreamEvent::AudioFrame(_) => "audio",
            StreamEvent::Error(_) => "error",
        }
    }
}

/// Encoded video for one frame. The payload is owned by the receiver.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub index: u32,
    /// Key frame: decoding can start here.
    pub idr: bool,
    pub payload: Bytes,
}

/// Interleaved PCM for one frame.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub index: u32,
    pub payload: Bytes,
}
