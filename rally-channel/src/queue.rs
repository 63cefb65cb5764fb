//! Pending queue for frames emitted while the link is down.
//!
//! Only used under `EmitPolicy::Queue`. Queued frames are flushed in order
//! once the session links up again, and dropped on `disconnect`.

use std::collections::VecDeque;

use crate::protocol::Frame;

#[derive(Debug)]
pub struct PendingQueue {
    queue: VecDeque<Frame>,
    max_size: usize,
}

impl PendingQueue {
    /// Create a new queue with max capacity.
    pub fn new(max_size: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    /// Queue a frame. Returns `false` when full.
    pub fn enqueue(&mut self, frame: Frame) -> bool {
        if self.queue.len() >= self.max_size {
            return false;
        }
        self.queue.push_back(frame);
        true
    }

    /// Drain all queued frames, oldest first.
    pub fn drain(&mut self) -> Vec<Frame> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pending_queue_fifo() {
        let mut queue = PendingQueue::new(10);
        assert!(queue.is_empty());

        queue.enqueue(Frame::new("ready", json!(1)));
        queue.enqueue(Frame::new("ready", json!(2)));
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(drained[0].payload, json!(1));
        assert_eq!(drained[1].payload, json!(2));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pending_queue_capacity() {
        let mut queue = PendingQueue::new(2);
        assert!(queue.enqueue(Frame::new("a", json!(null))));
        assert!(queue.enqueue(Frame::new("b", json!(null))));
        assert!(!queue.enqueue(Frame::new("c", json!(null))));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.capacity(), 2);
    }
}
