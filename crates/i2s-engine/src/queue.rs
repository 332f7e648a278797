//! Per-channel pending buffer queue.
//!
//! A bounded FIFO of caller-owned buffers. The queue has no locking of its
//! own: it lives inside the channel state and is only touched with the
//! channel lock held, so a push or pop is atomic together with the channel
//! flags it is coupled to.

use heapless::{Deque, Vec};
use platform::Mbo;

/// Maximum number of buffers pending on one channel.
pub const MAX_BUFFERS: usize = 32;

/// Buffers drained from a queue, oldest first.
pub type Drained = Vec<Mbo, MAX_BUFFERS>;

/// FIFO of buffers waiting for transfer.
#[derive(Debug)]
pub struct PendingQueue {
    items: Deque<Mbo, MAX_BUFFERS>,
}

impl Default for PendingQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingQueue {
    /// Empty queue.
    pub const fn new() -> Self {
        Self {
            items: Deque::new(),
        }
    }

    /// Append `mbo`; hands it back when the queue is full.
    pub fn push_back(&mut self, mbo: Mbo) -> Result<(), Mbo> {
        self.items.push_back(mbo)
    }

    /// Remove the oldest buffer.
    pub fn pop_front(&mut self) -> Option<Mbo> {
        self.items.pop_front()
    }

    /// Remove every buffer, oldest first.
    pub fn drain(&mut self) -> Drained {
        let mut drained = Drained::new();
        while let Some(mbo) = self.items.pop_front() {
            // Same capacity as the queue, so this never hands the buffer back.
            if let Err(mbo) = drained.push(mbo) {
                let _ = self.items.push_front(mbo);
                break;
            }
        }
        drained
    }

    /// Number of pending buffers.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// No buffer pending.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// No room for another buffer.
    pub fn is_full(&self) -> bool {
        self.items.is_full()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use platform::mocks::{leak_buffer, RecordingCompletion};

    fn mbo(context: usize) -> Mbo {
        Mbo::new(leak_buffer(4), RecordingCompletion::leak()).with_context(context)
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = PendingQueue::new();
        for i in 0..3 {
            queue.push_back(mbo(i)).unwrap();
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop_front().unwrap().context, 0);
        assert_eq!(queue.pop_front().unwrap().context, 1);
        assert_eq!(queue.pop_front().unwrap().context, 2);
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn test_drain_empties_oldest_first() {
        let mut queue = PendingQueue::new();
        for i in 10..15 {
            queue.push_back(mbo(i)).unwrap();
        }
        let drained = queue.drain();
        let order: std::vec::Vec<usize> = drained.iter().map(|m| m.context).collect();
        assert_eq!(order, std::vec![10, 11, 12, 13, 14]);
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_full_queue_hands_buffer_back() {
        let mut queue = PendingQueue::default();
        for i in 0..MAX_BUFFERS {
            queue.push_back(mbo(i)).unwrap();
        }
        assert!(queue.is_full());
        let rejected = queue.push_back(mbo(99)).unwrap_err();
        assert_eq!(rejected.context, 99);
        assert_eq!(queue.len(), MAX_BUFFERS);
    }
}
