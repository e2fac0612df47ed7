//! Pending-write queue
//!
//! Holds at most one pending write per register. A newer write for the same
//! register replaces the older one before it reaches the bus. Draining is
//! driven from outside, one command per tick, [`DRAIN_INTERVAL`] apart, so
//! the bus never sees two commands interleaved.
//!
//! The order in which different registers are drained is unspecified.

use std::collections::HashMap;
use std::time::Duration;

/// Pause between two drained commands
pub const DRAIN_INTERVAL: Duration = Duration::from_millis(150);

/// A write waiting for its turn on the bus
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommand<T> {
    /// Register name
    pub name: &'static str,
    /// Raw value, already scaled
    pub raw: u32,
    /// Handed back to the owner once the command was written
    pub completion: Option<T>,
}

/// Coalescing command queue
#[derive(Debug)]
pub struct CommandQueue<T> {
    pending: HashMap<&'static str, PendingCommand<T>>,
    draining: bool,
}

impl<T> Default for CommandQueue<T> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
            draining: false,
        }
    }
}

impl<T> CommandQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the pending write for `name`
    ///
    /// Returns `true` when the drain loop was idle; the caller must then
    /// schedule the next drain tick.
    pub fn enqueue(&mut self, name: &'static str, raw: u32, completion: Option<T>) -> bool {
        self.pending.insert(
            name,
            PendingCommand {
                name,
                raw,
                completion,
            },
        );
        let start = !self.draining;
        self.draining = true;
        start
    }

    /// Remove one pending command
    ///
    /// Returns `None` and marks the drain loop idle once nothing is left.
    pub fn take_next(&mut self) -> Option<PendingCommand<T>> {
        let name = self.pending.keys().next().copied();
        match name {
            Some(name) => self.pending.remove(name),
            None => {
                self.draining = false;
                None
            }
        }
    }

    /// Whether another drain tick is needed
    ///
    /// Also marks the loop idle when the queue has run dry.
    pub fn wants_tick(&mut self) -> bool {
        if self.pending.is_empty() {
            self.draining = false;
        }
        self.draining
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Raw value waiting for `name`, if any
    pub fn pending_raw(&self, name: &str) -> Option<u32> {
        self.pending.get(name).map(|c| c.raw)
    }
}
