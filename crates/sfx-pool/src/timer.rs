//! Cancellable deadlines on the manager clock.
//!
//! Nothing here sleeps or spawns: the owner advances its own clock and pops
//! whatever has come due. Entries fire in deadline order, ties in the order
//! they were scheduled.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Deadline queue carrying a payload per entry.
#[derive(Debug)]
pub struct ReclaimTimers<T> {
    next_seq: u64,
    queue: BTreeMap<(Duration, u64), T>,
    deadlines: HashMap<TimerId, Duration>,
}

impl<T> Default for ReclaimTimers<T> {
    fn default() -> Self {
        Self {
            next_seq: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }
}

impl<T> ReclaimTimers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `payload` to come due at `deadline`.
    pub fn schedule(&mut self, deadline: Duration, payload: T) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = TimerId(seq);
        self.queue.insert((deadline, seq), payload);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Remove a pending entry. Returns its payload, or `None` if it already
    /// fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let deadline = self.deadlines.remove(&id)?;
        self.queue.remove(&(deadline, id.0))
    }

    /// Pop the earliest entry whose deadline is `<= now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, T)> {
        let (&(deadline, seq), _) = self.queue.first_key_value()?;
        if deadline > now {
            return None;
        }
        let ((_, seq_popped), payload) = self.queue.pop_first()?;
        debug_assert_eq!(seq, seq_popped);
        let id = TimerId(seq_popped);
        self.deadlines.remove(&id);
        Some((id, payload))
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.first_key_value().map(|(&(deadline, _), _)| deadline)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
