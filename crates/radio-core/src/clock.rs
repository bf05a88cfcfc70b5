//! Cycle clock with named, replace-on-insert events.

/// Named events a radio schedules on its clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RadioEvent {
    /// End of a CCA measurement or a CSMA backoff.
    CcaDelay,
    /// Oscillator start-up after leaving sleep.
    WakeupDelay,
    /// End of the acknowledgment window after an ARET transmission.
    AckTimeout,
    /// Turnaround before an automatic acknowledgment is sent.
    AckTrigger,
    /// Next transmitter byte period.
    TxByte,
    /// Next receiver byte period.
    RxByte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending<E> {
    event: E,
    due: u64,
    seq: u64,
}

/// Monotonic cycle counter with at most one pending instance per named event.
///
/// Inserting an event that is already pending replaces the earlier instance. Events due
/// on the same cycle fire in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventClock<E> {
    now: u64,
    next_seq: u64,
    pending: Vec<Pending<E>>,
}

impl<E> Default for EventClock<E> {
    fn default() -> Self {
        Self {
            now: 0,
            next_seq: 0,
            pending: Vec::new(),
        }
    }
}

impl<E: Copy + Eq> EventClock<E> {
    /// Creates a clock at cycle zero with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cycle.
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.now
    }

    /// Schedules `event` `delay` cycles from now, replacing any pending instance.
    pub fn insert(&mut self, event: E, delay: u64) {
        self.remove(event);
        let due = self.now.saturating_add(delay);
        self.pending.push(Pending {
            event,
            due,
            seq: self.next_seq,
        });
        self.next_seq = self.next_seq.wrapping_add(1);
    }

    /// Cancels a pending event. Returns whether one was pending.
    pub fn remove(&mut self, event: E) -> bool {
        let before = self.pending.len();
        self.pending.retain(|entry| entry.event != event);
        before != self.pending.len()
    }

    /// True when `event` is pending.
    #[must_use]
    pub fn is_pending(&self, event: E) -> bool {
        self.pending.iter().any(|entry| entry.event == event)
    }

    /// Cycle at which `event` fires, if pending.
    #[must_use]
    pub fn due(&self, event: E) -> Option<u64> {
        self.pending
            .iter()
            .find(|entry| entry.event == event)
            .map(|entry| entry.due)
    }

    /// Earliest pending due cycle.
    #[must_use]
    pub fn next_due(&self) -> Option<u64> {
        self.pending.iter().map(|entry| entry.due).min()
    }

    /// Removes and returns the earliest event due at or before `limit`, advancing the
    /// clock to its due cycle.
    pub fn pop_due(&mut self, limit: u64) -> Option<(E, u64)> {
        let position = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due <= limit)
            .min_by_key(|(_, entry)| (entry.due, entry.seq))
            .map(|(position, _)| position)?;
        let entry = self.pending.swap_remove(position);
        self.now = self.now.max(entry.due);
        Some((entry.event, entry.due))
    }

    /// Moves the clock forward to `cycle`. Never moves backwards.
    pub fn advance_to(&mut self, cycle: u64) {
        self.now = self.now.max(cycle);
    }

    /// Cancels every pending event.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
