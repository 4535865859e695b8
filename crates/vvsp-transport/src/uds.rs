use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::endpoint::EndpointConfig;
use crate::error::{Result, TransportError};
use crate::stream::IpcStream;

/// Host-side endpoint: a listening Unix domain socket.
///
/// The socket file is removed on drop, but only if it is still the one this
/// listener created.
pub struct EndpointListener {
    listener: UnixListener,
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
}

impl EndpointListener {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// `sockaddr_un.sun_path` is 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    pub(crate) const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    pub(crate) const MAX_PATH_LEN: usize = 104;

    /// Bind the endpoint for an output index.
    pub fn bind_output(config: &EndpointConfig, index: u32) -> Result<Self> {
        Self::bind(config.path_for(index)?)
    }

    /// Bind and listen on a filesystem-path socket.
    ///
    /// A stale socket at `path` is removed first; any other file is left alone
    /// and reported as a bind error.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_SOCKET_MODE)
    }

    /// Bind with an explicit permission mode.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        check_path_len(&path)?;

        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(|e| bind_error(&path, e))?;
            if !metadata.file_type().is_socket() {
                return Err(bind_error(
                    &path,
                    std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                ));
            }
            debug!(?path, "removing stale endpoint");
            std::fs::remove_file(&path).map_err(|e| bind_error(&path, e))?;
        }

        let listener = UnixListener::bind(&path).map_err(|e| bind_error(&path, e))?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .map_err(|e| bind_error(&path, e))?;
        let created = std::fs::symlink_metadata(&path).map_err(|e| bind_error(&path, e))?;

        info!(?path, "endpoint listening");

        Ok(Self {
            listener,
            path,
            created_inode: Some((created.dev(), created.ino())),
        })
    }

    /// Accept the next client (blocking).
    pub fn accept(&self) -> Result<IpcStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(path = ?self.path, "accepted client");
        Ok(IpcStream::from_unix(stream))
    }

    /// Accept the next client, checking `cancel` every `poll`.
    ///
    /// Returns `Ok(None)` once cancelled with no client waiting. The listener
    /// is left non-blocking; the returned stream is blocking.
    pub fn accept_until(
        &self,
        cancel: &CancelToken,
        poll: Duration,
    ) -> Result<Option<IpcStream>> {
        self.listener.set_nonblocking(true)?;
        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    // BSD-derived systems hand out sockets that inherit O_NONBLOCK.
                    stream.set_nonblocking(false)?;
                    debug!(path = ?self.path, "accepted client");
                    return Ok(Some(IpcStream::from_unix(stream)));
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
                    ) =>
                {
                    if cancel.is_cancelled() {
                        debug!(path = ?self.path, "accept cancelled");
                        return Ok(None);
                    }
                    std::thread::sleep(poll);
                }
                Err(err) => return Err(TransportError::Accept(err)),
            }
        }
    }

    /// The path this endpoint is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for EndpointListener {
    fn drop(&mut self) {
        let Some((expected_dev, expected_ino)) = self.created_inode else {
            return;
        };
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket()
                && metadata.dev() == expected_dev
                && metadata.ino() == expected_ino
            {
                debug!(path = ?self.path, "removing endpoint");
                let _ = std::fs::remove_file(&self.path);
            } else {
                debug!(path = ?self.path, "endpoint path replaced; skipping cleanup");
            }
        }
    }
}

pub(crate) fn check_path_len(path: &Path) -> Result<()> {
    let len = path.as_os_str().len();
    if len >= EndpointListener::MAX_PATH_LEN {
        return Err(TransportError::PathTooLong {
            path: path.to_path_buf(),
            len,
            max: EndpointListener::MAX_PATH_LEN,
        });
    }
    Ok(())
}

fn bind_error(path: &Path, source: std::io::Error) -> TransportError {
    TransportError::Bind {
        path: path.to_path_buf(),
        source,
    }
}
