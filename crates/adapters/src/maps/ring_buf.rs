use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Bounded FIFO. Producers never block; a full buffer drops the new item.
pub struct RingBuf<T> {
    capacity: usize,
    queue: Mutex<VecDeque<T>>,
}

impl<T> RingBuf<T> {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity: capacity as usize,
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// `false` when the buffer was full and `item` was dropped.
    pub fn push(&self, item: T) -> bool {
        let mut q = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if q.len() >= self.capacity {
            return false;
        }
        q.push_back(item);
        true
    }

    pub fn drain(&self, max: usize) -> Vec<T> {
        let mut q = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let n = max.min(q.len());
        q.drain(..n).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
