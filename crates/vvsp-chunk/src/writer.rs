use std::io::{ErrorKind, Write};

use bytes::{BufMut, BytesMut};
use vvsp_transport::CancelToken;

use crate::error::{ChunkError, Result};
use crate::fourcc::{FourCc, FRAME_AUDIO, FRAME_HEADER, FRAME_VIDEO, MAGIC};
use crate::layout::{ChunkHeader, FrameHeader, StreamHeader};
use crate::reader::is_timeout;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes chunks to any blocking `Write` stream (host side).
pub struct ChunkWriter<T> {
    inner: T,
    buf: BytesMut,
    cancel: CancelToken,
}

impl<T: Write> ChunkWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            cancel: CancelToken::new(),
        }
    }

    /// Observe `cancel` while blocked on the stream.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Write one chunk (header + payload) and flush.
    pub fn write_chunk(&mut self, fourcc: FourCc, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        self.append_chunk(fourcc, payload)?;
        self.send_buffer()
    }

    /// Write the handshake chunk.
    pub fn write_stream_header(&mut self, header: &StreamHeader) -> Result<()> {
        let mut payload = [0u8; StreamHeader::SIZE];
        header.encode(&mut &mut payload[..]);
        self.write_chunk(MAGIC, &payload)
    }

    /// Write a full frame: `fhdr`, `fvid`, `faud`, as one flush.
    pub fn write_frame(&mut self, header: &FrameHeader, video: &[u8], audio: &[u8]) -> Result<()> {
        let mut raw = [0u8; FrameHeader::SIZE];
        header.encode(&mut &mut raw[..]);

        self.buf.clear();
        self.append_chunk(FRAME_HEADER, &raw)?;
        self.append_chunk(FRAME_VIDEO, video)?;
        self.append_chunk(FRAME_AUDIO, audio)?;
        self.send_buffer()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn append_chunk(&mut self, fourcc: FourCc, payload: &[u8]) -> Result<()> {
        let size = i32::try_from(payload.len()).map_err(|_| ChunkError::TooLarge {
            size: payload.len(),
            max: i32::MAX as usize,
        })?;
        self.buf.reserve(ChunkHeader::SIZE + payload.len());
        ChunkHeader::new(fourcc, size).encode(&mut self.buf);
        self.buf.put_slice(payload);
        Ok(())
    }

    fn send_buffer(&mut self) -> Result<()> {
        write_fully(&mut self.inner, &self.cancel, &self.buf)
    }
}

/// Write all of `bytes` and flush.
///
/// Timeouts re-check `cancel` and retry. A peer that has gone away
/// (zero-length write, broken pipe, reset) is `EndOfStream`.
pub fn write_fully<W: Write>(writer: &mut W, cancel: &CancelToken, bytes: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match writer.write(&bytes[offset..]) {
            Ok(0) => return Err(ChunkError::EndOfStream),
            Ok(n) => offset += n,
            Err(err) => retry_or_fail(err, cancel)?,
        }
    }

    loop {
        match writer.flush() {
            Ok(()) => return Ok(()),
            Err(err) => retry_or_fail(err, cancel)?,
        }
    }
}

fn retry_or_fail(err: std::io::Error, cancel: &CancelToken) -> Result<()> {
    match err.kind() {
        ErrorKind::Interrupted => Ok(()),
        _ if is_timeout(&err) => {
            if cancel.is_cancelled() {
                Err(ChunkError::Cancelled)
            } else {
                Ok(())
            }
        }
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => Err(ChunkError::EndOfStream),
        _ => Err(ChunkError::Io(err)),
    }
}
