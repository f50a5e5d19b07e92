//! In-memory event list ordered by instant.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use crate::core::{EventList, KernelError};
use crate::util::time::Instant;

/// Wrapper making a pending instant orderable: earliest first, FIFO within an instant.
struct PendingEvent {
    at: Instant,
    seq: u64,
}

impl PartialEq for PendingEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingEvent {}

impl PartialOrd for PendingEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

/// In-memory event list storing pending instants in a min-heap.
/// This provides O(log n) insertion and O(log n) removal of the next event.
///
/// Removed instants are tombstoned and skipped lazily; the heap is compacted
/// once tombstones outnumber live events.
pub struct InMemoryEventList {
    max_depth: usize,
    next_seq: u64,
    events: BinaryHeap<Reverse<PendingEvent>>,
    /// Tombstones per instant, not yet dropped from the heap.
    removed: HashMap<Instant, usize>,
    removed_total: usize,
}

impl InMemoryEventList {
    /// Create a new event list holding at most `max_depth` pending instants.
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            next_seq: 0,
            events: BinaryHeap::with_capacity(max_depth.min(1024)),
            removed: HashMap::new(),
            removed_total: 0,
        }
    }

    /// Drop tombstoned events from the top so the earliest entry is live.
    fn purge_top(&mut self) {
        while let Some(Reverse(top)) = self.events.peek() {
            let Some(count) = self.removed.get_mut(&top.at) else {
                break;
            };
            *count -= 1;
            if *count == 0 {
                let at = top.at;
                self.removed.remove(&at);
            }
            self.removed_total -= 1;
            self.events.pop();
        }
    }

    fn compact(&mut self) {
        let mut removed = std::mem::take(&mut self.removed);
        self.events.retain(|Reverse(event)| match removed.get_mut(&event.at) {
            Some(count) if *count > 0 => {
                *count -= 1;
                false
            }
            _ => true,
        });
        self.removed_total = 0;
    }
}

impl EventList for InMemoryEventList {
    fn schedule(&mut self, at: Instant) -> Result<(), KernelError> {
        if self.len() >= self.max_depth() {
            return Err(KernelError::EventListFull(format!(
                "max depth {} reached",
                self.max_depth
            )));
        }
        self.events.push(Reverse(PendingEvent {
            at,
            seq: self.next_seq,
        }));
        self.next_seq += 1;
        self.purge_top();
        Ok(())
    }

    fn remove(&mut self, at: Instant) {
        *self.removed.entry(at).or_insert(0) += 1;
        self.removed_total += 1;
        self.purge_top();
        if self.removed_total * 2 > self.events.len() {
            self.compact();
        }
    }

    fn pop_next(&mut self) -> Option<Instant> {
        let next = self.events.pop().map(|Reverse(event)| event.at);
        self.purge_top();
        next
    }

    fn peek(&self) -> Option<Instant> {
        self.events.peek().map(|Reverse(event)| event.at)
    }

    fn clear(&mut self) {
        self.events.clear();
        self.removed.clear();
        self.removed_total = 0;
    }

    fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn len(&self) -> usize {
        self.events.len() - self.removed_total
    }
}
