use std::collections::VecDeque;

use log::warn;

use super::{ChannelId, HistogramBins};

/// Which capture produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    Channel(ChannelId),
    /// Legacy single-channel histogram
    Legacy,
}

/// A completed histogram waiting for a consumer to drain it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramEvent {
    pub source: EventSource,
    pub user_handle: u32,
    /// Frame-completion sequence number the result was harvested on.
    pub sequence: u64,
    pub bins: HistogramBins,
}

/// Bounded FIFO of undelivered histogram events.
///
/// When full, the oldest event is dropped to make room.
#[derive(Debug)]
pub struct PendingEvents {
    queue: VecDeque<HistogramEvent>,
    capacity: usize,
    dropped: u64,
}

impl PendingEvents {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub(crate) fn push(&mut self, event: HistogramEvent) {
        if self.queue.len() >= self.capacity {
            if let Some(oldest) = self.queue.pop_front() {
                self.dropped += 1;
                warn!(
                    "histogram: event queue full ({}), dropping {:?} from frame {}",
                    self.capacity, oldest.source, oldest.sequence
                );
            }
        }
        self.queue.push_back(event);
    }

    /// Remove and return every queued event, oldest first.
    pub(crate) fn drain(&mut self) -> Vec<HistogramEvent> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(sequence: u64) -> HistogramEvent {
        HistogramEvent {
            source: EventSource::Channel(ChannelId::new(0).unwrap()),
            user_handle: 0,
            sequence,
            bins: HistogramBins::zeroed(),
        }
    }

    #[test]
    fn test_drain_preserves_order() {
        let mut events = PendingEvents::new(4);
        for seq in 1..=3 {
            events.push(event(seq));
        }
        let drained: Vec<u64> = events.drain().iter().map(|e| e.sequence).collect();
        assert_eq!(drained, vec![1, 2, 3]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut events = PendingEvents::new(2);
        for seq in 1..=5 {
            events.push(event(seq));
        }
        assert_eq!(events.len(), 2);
        assert_eq!(events.dropped(), 3);
        let drained: Vec<u64> = events.drain().iter().map(|e| e.sequence).collect();
        assert_eq!(drained, vec![4, 5]);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let events = PendingEvents::new(0);
        assert_eq!(events.capacity(), 1);
    }
}
