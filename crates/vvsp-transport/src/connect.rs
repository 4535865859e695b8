use std::io::{Read, Write};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::Result;

/// Opens a fresh stream to the host.
///
/// `Ok(None)` means the attempt timed out (no host listening yet, or the
/// attempt was cut short by cancellation). The caller is expected to check
/// its cancel token and try again. `Err` is a genuine failure.
pub trait Connect {
    type Stream: Read + Write;

    fn connect(
        &mut self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Option<Self::Stream>>;
}

#[cfg(unix)]
pub use self::unix::EndpointConnector;

#[cfg(unix)]
mod unix {
    use std::io::ErrorKind;
    use std::os::unix::net::UnixStream;
    use std::path::{Path, PathBuf};
    use std::time::{Duration, Instant};

    use tracing::{debug, trace};

    use super::Connect;
    use crate::cancel::CancelToken;
    use crate::endpoint::EndpointConfig;
    use crate::error::{Result, TransportError};
    use crate::stream::IpcStream;
    use crate::uds::check_path_len;

    const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(50);
    const DEFAULT_IO_TIMEOUT: Duration = Duration::from_millis(100);

    /// Connects to a host endpoint path, waiting for it to appear.
    #[derive(Debug, Clone)]
    pub struct EndpointConnector {
        path: PathBuf,
        retry_interval: Duration,
        io_timeout: Option<Duration>,
    }

    impl EndpointConnector {
        pub fn new(path: impl AsRef<Path>) -> Self {
            Self {
                path: path.as_ref().to_path_buf(),
                retry_interval: DEFAULT_RETRY_INTERVAL,
                io_timeout: Some(DEFAULT_IO_TIMEOUT),
            }
        }

        /// Connector for the endpoint of an output index.
        pub fn for_output(config: &EndpointConfig, index: u32) -> Result<Self> {
            Ok(Self::new(config.path_for(index)?))
        }

        /// Delay between attempts while the endpoint is absent.
        pub fn with_retry_interval(mut self, interval: Duration) -> Self {
            self.retry_interval = interval;
            self
        }

        /// Read/write timeout applied to connected streams.
        ///
        /// This is a wake-up interval for cancellation checks, not a data
        /// deadline: readers retry after it fires unless cancelled.
        pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
            self.io_timeout = timeout;
            self
        }

        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Connect for EndpointConnector {
        type Stream = IpcStream;

        fn connect(
            &mut self,
            timeout: Duration,
            cancel: &CancelToken,
        ) -> Result<Option<IpcStream>> {
            check_path_len(&self.path)?;
            let deadline = Instant::now() + timeout;

            loop {
                match UnixStream::connect(&self.path) {
                    Ok(stream) => {
                        let stream = IpcStream::from_unix(stream);
                        stream.set_read_timeout(self.io_timeout)?;
                        stream.set_write_timeout(self.io_timeout)?;
                        debug!(path = ?self.path, "connected to endpoint");
                        return Ok(Some(stream));
                    }
                    Err(err) if is_not_ready(&err) => {
                        let now = Instant::now();
                        if now >= deadline || cancel.is_cancelled() {
                            trace!(path = ?self.path, "endpoint not available");
                            return Ok(None);
                        }
                        std::thread::sleep(self.retry_interval.min(deadline - now));
                    }
                    Err(source) => {
                        return Err(TransportError::Connect {
                            path: self.path.clone(),
                            source,
                        })
                    }
                }
            }
        }
    }

    fn is_not_ready(err: &std::io::Error) -> bool {
        matches!(
            err.kind(),
            ErrorKind::NotFound | ErrorKind::ConnectionRefused
        )
    }

}
