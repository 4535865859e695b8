use std::sync::Arc;

use tracing::debug;
use vvsp_chunk::{Command, StreamHeader};
use vvsp_transport::CancelToken;

use crate::state::{ConnectionState, Shared};

/// Cheap, clonable access to a running client from any thread.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    shared: Arc<Shared>,
    cancel: CancelToken,
}

impl ClientHandle {
    pub(crate) fn new(shared: Arc<Shared>, cancel: CancelToken) -> Self {
        Self { shared, cancel }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// True while a handshake-complete session is live.
    pub fn is_connected(&self) -> bool {
        self.shared.state() == ConnectionState::Streaming
    }

    /// Stream parameters of the live session, if any.
    pub fn header(&self) -> Option<StreamHeader> {
        self.shared.header()
    }

    /// Queue a command for the host.
    ///
    /// Commands are only accepted while connected; otherwise they are
    /// dropped. A command queued just as the session ends is discarded when
    /// the next session starts.
    pub fn send(&self, command: &Command) {
        if !self.is_connected() {
            debug!(?command, "not connected; dropping command");
            return;
        }
        self.shared.queue.push(command.encode());
    }

    /// Commands queued but not yet written.
    pub fn pending_commands(&self) -> usize {
        self.shared.queue.len()
    }

    /// Stop the client loop. It closes the transport and exits.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
