use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// FIFO of formatted lines waiting to be written.
///
/// Every operation takes the same lock, so a drain observes exactly the
/// lines enqueued before it.
#[derive(Debug, Default)]
pub struct PendingQueue {
    lines: Mutex<VecDeque<String>>,
}

impl PendingQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        // a panicking producer cannot leave a half-pushed line behind
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a line at the tail.
    pub fn enqueue(&self, line: String) {
        self.lock().push_back(line);
    }

    /// Remove and return every queued line, oldest first.
    pub fn drain_all(&self) -> VecDeque<String> {
        std::mem::take(&mut *self.lock())
    }

    /// Put undelivered lines back at the head, ahead of anything enqueued
    /// since they were drained.
    pub fn requeue(&self, lines: VecDeque<String>) {
        if lines.is_empty() {
            return;
        }
        let mut queue = self.lock();
        for line in lines.into_iter().rev() {
            queue.push_front(line);
        }
    }

    /// Number of queued lines.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
