use std::collections::VecDeque;
use std::num::NonZeroUsize;

use crate::midi::ControlEvent;

/// Default number of retained events.
pub const DEFAULT_CAPACITY: usize = 64;

/// Bounded FIFO of control events, oldest first.
///
/// Overflow evicts from the front immediately after each push, so `len() <= capacity()`
/// always holds. Nothing is ever rejected.
#[derive(Debug, Clone)]
pub struct EventQueue {
    events: VecDeque<ControlEvent>,
    capacity: NonZeroUsize,
}

impl EventQueue {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.get() + 1),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Append `event`, then evict the oldest entries until the bound holds.
    ///
    /// Returns how many events were evicted.
    pub fn push(&mut self, event: ControlEvent) -> usize {
        self.events.push_back(event);
        let mut evicted = 0;
        while self.events.len() > self.capacity.get() {
            self.events.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &ControlEvent> + '_ {
        self.events.iter()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        // DEFAULT_CAPACITY is a non-zero literal.
        Self::new(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}
