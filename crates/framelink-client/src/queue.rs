//! Outbound FIFO queue of call envelopes awaiting transmission.

use std::collections::VecDeque;

use framelink_transport::protocol::Call;

/// FIFO queue preserving call issuance order.
///
/// Holds only calls not yet handed to the transport; a call counts as sent
/// the instant the transport accepts it, regardless of when its reply
/// arrives.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    entries: VecDeque<Call>,
}

impl OutboundQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail. Does not itself send.
    pub fn enqueue(&mut self, call: Call) {
        self.entries.push_back(call);
    }

    /// Remove and return the head element.
    pub fn pop(&mut self) -> Option<Call> {
        self.entries.pop_front()
    }

    /// Drop every queued call, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    /// Number of queued calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = OutboundQueue::new();
        queue.enqueue(Call::new(Uuid::new_v4(), "first", vec![]));
        queue.enqueue(Call::new(Uuid::new_v4(), "second", vec![]));

        assert_eq!(queue.pop().unwrap().method, "first");
        assert_eq!(queue.pop().unwrap().method, "second");
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_clear_reports_dropped_count() {
        let mut queue = OutboundQueue::new();
        queue.enqueue(Call::new(Uuid::new_v4(), "a", vec![]));
        queue.enqueue(Call::new(Uuid::new_v4(), "b", vec![]));

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.clear(), 0);
    }
}
