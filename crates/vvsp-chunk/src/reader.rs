use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::debug;
use vvsp_transport::CancelToken;

use crate::error::{ChunkError, Result};
use crate::fourcc::FourCc;
use crate::layout::ChunkHeader;

/// Default upper bound on a single chunk payload: 64 MiB.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

const SKIP_BUFFER_SIZE: usize = 8 * 1024;

/// A complete chunk: type tag and owned payload.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub fourcc: FourCc,
    pub payload: Bytes,
}

/// Reads chunks from any blocking `Read` stream.
///
/// Every read either consumes a whole unit (header or payload) or fails;
/// callers never observe a partially read chunk. Reads that wake up on the
/// stream's I/O timeout are retried unless the cancel token was raised.
pub struct ChunkReader<T> {
    inner: T,
    buf: BytesMut,
    cancel: CancelToken,
    max_chunk_size: usize,
}

impl<T: Read> ChunkReader<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            cancel: CancelToken::new(),
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }

    /// Observe `cancel` while blocked on the stream.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    /// Read the next 8-byte chunk header. Negative sizes are rejected here;
    /// the size limit only applies to payloads that get buffered.
    pub fn read_chunk_header(&mut self) -> Result<ChunkHeader> {
        if self.cancel.is_cancelled() {
            return Err(ChunkError::Cancelled);
        }

        let mut raw = [0u8; ChunkHeader::SIZE];
        read_full(&mut self.inner, &self.cancel, &mut raw)?;
        let header = ChunkHeader::decode(&raw)?;
        header.payload_len()?;
        Ok(header)
    }

    /// Read exactly the payload announced by `header`.
    ///
    /// The returned buffer belongs to the caller. Its allocation is reused
    /// for later payloads only after every clone of it has been dropped.
    /// Payloads above `max_chunk_size` are `TooLarge` and left unread.
    pub fn read_chunk_payload(&mut self, header: &ChunkHeader) -> Result<Bytes> {
        let len = header.payload_len()?;
        if len > self.max_chunk_size {
            return Err(ChunkError::TooLarge {
                size: len,
                max: self.max_chunk_size,
            });
        }
        self.buf.clear();
        self.buf.resize(len, 0);
        read_full(&mut self.inner, &self.cancel, &mut self.buf[..])?;
        Ok(self.buf.split().freeze())
    }

    /// Consume and discard the payload announced by `header`.
    ///
    /// Returns only after every payload byte has been read, so the next
    /// header read starts on a chunk boundary.
    pub fn skip_chunk_payload(&mut self, header: &ChunkHeader) -> Result<()> {
        let mut remaining = header.payload_len()?;
        let mut scratch = [0u8; SKIP_BUFFER_SIZE];
        while remaining > 0 {
            let n = remaining.min(SKIP_BUFFER_SIZE);
            read_full(&mut self.inner, &self.cancel, &mut scratch[..n])?;
            remaining -= n;
        }
        Ok(())
    }

    /// Read the next complete chunk of any type.
    pub fn read_chunk(&mut self) -> Result<Chunk> {
        let header = self.read_chunk_header()?;
        let payload = self.read_chunk_payload(&header)?;
        Ok(Chunk {
            fourcc: header.fourcc,
            payload,
        })
    }

    /// Read the next chunk, which must be of type `expected`.
    ///
    /// On a mismatch the payload is left unread; the stream is no longer
    /// usable after that.
    pub fn read_expected(&mut self, expected: FourCc) -> Result<Bytes> {
        let header = self.read_chunk_header()?;
        if header.fourcc != expected {
            return Err(ChunkError::UnexpectedChunk {
                expected,
                found: header.fourcc,
            });
        }
        self.read_chunk_payload(&header)
    }

    /// Skip chunks until one of type `wanted` arrives and return its payload
    /// together with the number of chunks skipped on the way.
    pub fn read_until(&mut self, wanted: FourCc) -> Result<(Bytes, usize)> {
        let mut skipped = 0usize;
        loop {
            let header = self.read_chunk_header()?;
            if header.fourcc == wanted {
                return Ok((self.read_chunk_payload(&header)?, skipped));
            }
            debug!(fourcc = %header.fourcc, size = header.size, "skipping chunk");
            self.skip_chunk_payload(&header)?;
            skipped += 1;
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

/// Fill `buf` completely.
///
/// End of stream before the buffer is full is `EndOfStream`, as is a reset
/// connection. Timeouts re-check `cancel` and retry.
fn read_full<R: Read>(reader: &mut R, cancel: &CancelToken, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(ChunkError::EndOfStream),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_timeout(&err) => {
                if cancel.is_cancelled() {
                    return Err(ChunkError::Cancelled);
                }
            }
            Err(err) if err.kind() == ErrorKind::ConnectionReset => {
                return Err(ChunkError::EndOfStream)
            }
            Err(err) => return Err(ChunkError::Io(err)),
        }
    }
    Ok(())
}

pub(crate) fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
