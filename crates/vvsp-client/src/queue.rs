use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

/// Unbounded FIFO of serialized commands waiting to be written.
///
/// Any number of threads may push. Only the client loop drains or clears.
#[derive(Debug, Default)]
pub struct CommandQueue {
    inner: Mutex<VecDeque<Bytes>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: Bytes) {
        self.lock().push_back(command);
    }

    /// Take every queued command, oldest first.
    pub fn drain_all(&self) -> Vec<Bytes> {
        self.lock().drain(..).collect()
    }

    /// Drop every queued command and return how many were dropped.
    pub fn clear(&self) -> usize {
        let mut queue = self.lock();
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the deque half-updated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Bytes>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
