use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{PoisonError, RwLock};

use vvsp_chunk::StreamHeader;

use crate::queue::CommandQueue;

/// Lifecycle of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// No transport.
    Disconnected = 0,
    /// Transport open, handshake pending.
    Connecting = 1,
    /// Handshake done, frames flowing.
    Streaming = 2,
    /// Protocol or I/O failure. Terminal.
    Faulted = 3,
    /// Cancelled. Terminal.
    Stopped = 4,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Disconnected,
            1 => Self::Connecting,
            2 => Self::Streaming,
            3 => Self::Faulted,
            _ => Self::Stopped,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Faulted | Self::Stopped)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Faulted => "faulted",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// State shared between the client loop and its handles.
#[derive(Debug)]
pub(crate) struct Shared {
    state: AtomicU8,
    header: RwLock<Option<StreamHeader>>,
    pub(crate) queue: CommandQueue,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            header: RwLock::new(None),
            queue: CommandQueue::new(),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn header(&self) -> Option<StreamHeader> {
        *self.header.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handshake succeeded: drop stale commands, publish the header, go live.
    /// Returns the number of stale commands dropped.
    pub(crate) fn begin_session(&self, header: StreamHeader) -> usize {
        let dropped = self.queue.clear();
        *self.header.write().unwrap_or_else(PoisonError::into_inner) = Some(header);
        self.set_state(ConnectionState::Streaming);
        dropped
    }

    /// Transport gone: withdraw the header.
    pub(crate) fn end_session(&self, next: ConnectionState) {
        self.set_state(next);
        *self.header.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
