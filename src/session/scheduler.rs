//! Single-task timer queue
//!
//! Timers are `(deadline, id)` entries in a min-heap. Cancelling only drops
//! the event payload; the stale heap entry is skipped when it surfaces.
//! Entries with the same deadline fire in scheduling order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use tokio::time::Instant;

/// Handle of a scheduled timer, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// Priority queue of timed events
#[derive(Debug)]
pub struct Scheduler<E> {
    heap: BinaryHeap<Reverse<(Instant, u64)>>,
    events: HashMap<u64, (Instant, E)>,
    next_id: u64,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            events: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `event` at `deadline`
    pub fn schedule_at(&mut self, deadline: Instant, event: E) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse((deadline, id)));
        self.events.insert(id, (deadline, event));
        TimerHandle(id)
    }

    /// Fire `event` after `delay`
    pub fn schedule_in(&mut self, delay: Duration, event: E) -> TimerHandle {
        self.schedule_at(Instant::now() + delay, event)
    }

    /// Cancel a timer; returns the event if it had not fired yet
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<E> {
        self.events.remove(&handle.0).map(|(_, event)| event)
    }

    /// Whether the timer is still pending
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.events.contains_key(&handle.0)
    }

    /// When a pending timer will fire
    pub fn deadline(&self, handle: TimerHandle) -> Option<Instant> {
        self.events.get(&handle.0).map(|(deadline, _)| *deadline)
    }

    /// Earliest live deadline
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.drop_cancelled();
        self.heap.peek().map(|Reverse((deadline, _))| *deadline)
    }

    /// Remove and return the earliest event due at or before `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<E> {
        self.drop_cancelled();
        match self.heap.peek() {
            Some(Reverse((deadline, _))) if *deadline <= now => {
                let Reverse((_, id)) = self.heap.pop()?;
                self.events.remove(&id).map(|(_, event)| event)
            }
            _ => None,
        }
    }

    /// Number of live timers
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn drop_cancelled(&mut self) {
        while let Some(Reverse((_, id))) = self.heap.peek() {
            if self.events.contains_key(id) {
                break;
            }
            self.heap.pop();
        }
    }
}
