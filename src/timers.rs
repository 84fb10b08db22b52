//! One-shot timers over a logical clock.
//!
//! Components schedule [`TimerTask`]s with a delay; the host advances the
//! clock and gets back whatever came due, one task at a time, so a task that
//! schedules a follow-up sees the clock at its own deadline.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::dom::ElementRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Work a timer performs when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// Bypass control leaves its busy state and shows the failure treatment.
    BypassFailed,
    /// Bypass control resets and the access dialog closes.
    BypassReset,
    /// Removes a staff-page notification if it is still shown.
    DismissNotification(ElementRef),
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    next_id: u64,
    // Ordered by deadline, then by scheduling order.
    pending: BTreeMap<(Duration, TimerId), TimerTask>,
    deadlines: HashMap<TimerId, Duration>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, task: TimerTask) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let deadline = self.now + delay;
        self.pending.insert((deadline, id), task);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Returns false when the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.pending.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    /// Drops every pending task; the clock keeps its position.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.deadlines.clear();
        dropped
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// pop_due
    ///
    /// Removes the earliest task whose deadline is at or before `until` and
    /// moves the clock to that deadline. Returns `None` (and moves the clock
    /// to `until`) once nothing else is due.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, TimerTask)> {
        let due = self
            .pending
            .keys()
            .next()
            .copied()
            .filter(|(deadline, _)| *deadline <= until);

        match due {
            Some(key) => {
                let task = self.pending.remove(&key)?;
                self.deadlines.remove(&key.1);
                self.now = self.now.max(key.0);
                Some((key.1, task))
            }
            None => {
                self.now = self.now.max(until);
                None
            }
        }
    }
}
