//! Time-ordered deferred action scheduler.
//!
//! Gameplay timers (build completion, weapon cooldowns, effect lifetimes)
//! are expressed as closures scheduled against the simulation clock rather
//! than per-component countdown fields. The queue is drained once per tick
//! after the entity update pass.
//!
//! The queue is generic over the context `C` handed to each action, so it
//! carries no dependency on the entity layer and tests can drive it with
//! any context they like. Actions also receive the queue itself, which
//! keeps re-entrant scheduling (an action re-arming itself) possible.
//!
//! # Ordering
//!
//! Actions run in non-decreasing due-time order. Entries with equal due
//! times run in push order; callers must not rely on that tie-break, it is
//! an implementation detail.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Deferred action invoked with the simulation context and the queue.
pub type Action<C> = Box<dyn FnOnce(&mut C, &mut UpdateQueue<C>)>;

/// A scheduled entry in the queue.
///
/// Ordered as a min-heap element: earliest due time first, push sequence
/// as the tie-breaker so ordering is total and consistent.
struct Entry<C> {
    /// Absolute due time in simulation seconds.
    due: f64,
    /// Monotonically increasing push counter.
    seq: u64,
    /// The deferred action.
    action: Action<C>,
}

impl<C> PartialEq for Entry<C> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<C> Eq for Entry<C> {}

impl<C> Ord for Entry<C> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so comparisons are reversed for
        // min-heap behavior: lower due time = higher priority.
        match other.due.total_cmp(&self.due) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

impl<C> PartialOrd for Entry<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Time-ordered deferred action queue.
///
/// # Example
///
/// ```
/// use rp_sim::update_queue::UpdateQueue;
///
/// let mut fired: Vec<&str> = Vec::new();
/// let mut queue: UpdateQueue<Vec<&str>> = UpdateQueue::new();
/// queue.push(2.0, |log, _| log.push("later"));
/// queue.push(1.0, |log, _| log.push("sooner"));
///
/// queue.update(1.5, &mut fired);
/// assert_eq!(fired, ["sooner"]);
///
/// queue.update(1.0, &mut fired);
/// assert_eq!(fired, ["sooner", "later"]);
/// ```
pub struct UpdateQueue<C> {
    /// Simulation clock in seconds, advanced by each `update` call.
    clock: f64,
    /// Next push sequence number.
    next_seq: u64,
    /// Pending entries.
    entries: BinaryHeap<Entry<C>>,
}

impl<C> UpdateQueue<C> {
    /// Create an empty queue with the clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: 0.0,
            next_seq: 0,
            entries: BinaryHeap::new(),
        }
    }

    /// Current queue clock in simulation seconds.
    #[must_use]
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether no entries are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Schedule `action` to run `timeout` seconds from the current clock.
    ///
    /// Always accepted. A negative timeout is clamped to zero, which
    /// schedules the action for the next drain.
    pub fn push<F>(&mut self, timeout: f64, action: F)
    where
        F: FnOnce(&mut C, &mut UpdateQueue<C>) + 'static,
    {
        let timeout = timeout.max(0.0);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry {
            due: self.clock + timeout,
            seq,
            action: Box::new(action),
        });
    }

    /// Advance the clock by `dt` seconds and run every due action.
    ///
    /// Actions run in non-decreasing due-time order. The cutoff is the
    /// clock value after advancing, fixed before any action runs: entries
    /// pushed by an action during the drain, zero-timeout ones included,
    /// never run until the next `update` call, so a self-rescheduling
    /// action cannot spin the drain forever.
    ///
    /// Panics raised by an action propagate to the caller and abort the
    /// remaining drain for this tick.
    pub fn update(&mut self, dt: f64, ctx: &mut C) {
        debug_assert!(dt >= 0.0, "UpdateQueue::update called with negative dt");
        self.clock += dt.max(0.0);
        let cutoff = self.clock;

        // Collect-then-invoke: repeated pops yield due entries already in
        // order, and anything pushed by the actions below lands in the
        // heap for the next call.
        let mut due = Vec::new();
        while self
            .entries
            .peek()
            .is_some_and(|entry| entry.due <= cutoff)
        {
            due.push(self.entries.pop().expect("peeked entry present"));
        }

        for entry in due {
            (entry.action)(ctx, self);
        }
    }
}

impl<C> Default for UpdateQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for UpdateQueue<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateQueue")
            .field("clock", &self.clock)
            .field("pending", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<&'static str>;

    #[test]
    fn test_runs_in_due_order() {
        let mut queue: UpdateQueue<Log> = UpdateQueue::new();
        let mut log = Log::new();

        queue.push(3.0, |l: &mut Log, _| l.push("c"));
        queue.push(1.0, |l: &mut Log, _| l.push("a"));
        queue.push(2.0, |l: &mut Log, _| l.push("b"));

        queue.update(5.0, &mut log);
        assert_eq!(log, ["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_partial_drain_then_rest() {
        let mut queue: UpdateQueue<Log> = UpdateQueue::new();
        let mut log = Log::new();

        queue.push(2.0, |l: &mut Log, _| l.push("late"));
        queue.push(1.0, |l: &mut Log, _| l.push("early"));

        queue.update(1.5, &mut log);
        assert_eq!(log, ["early"]);
        assert_eq!(queue.len(), 1);

        queue.update(1.0, &mut log);
        assert_eq!(log, ["early", "late"]);
    }

    #[test]
    fn test_never_runs_before_due() {
        let mut queue: UpdateQueue<Log> = UpdateQueue::new();
        let mut log = Log::new();

        queue.push(10.0, |l: &mut Log, _| l.push("x"));
        queue.update(9.9, &mut log);
        assert!(log.is_empty());

        queue.update(0.1, &mut log);
        assert_eq!(log, ["x"]);
    }

    #[test]
    fn test_zero_timeout_reentrant_push_waits_for_next_update() {
        let mut queue: UpdateQueue<Log> = UpdateQueue::new();
        let mut log = Log::new();

        queue.push(0.0, |l: &mut Log, q: &mut UpdateQueue<Log>| {
            l.push("outer");
            q.push(0.0, |l: &mut Log, _| l.push("inner"));
        });

        queue.update(1.0, &mut log);
        assert_eq!(log, ["outer"]);
        assert_eq!(queue.len(), 1);

        queue.update(0.0, &mut log);
        assert_eq!(log, ["outer", "inner"]);
    }

    #[test]
    fn test_reentrant_future_push_runs_when_due() {
        let mut queue: UpdateQueue<Log> = UpdateQueue::new();
        let mut log = Log::new();

        queue.push(1.0, |l: &mut Log, q: &mut UpdateQueue<Log>| {
            l.push("first");
            q.push(2.0, |l: &mut Log, _| l.push("second"));
        });

        queue.update(1.0, &mut log);
        assert_eq!(log, ["first"]);

        // The rescheduled entry is due at clock 3.0.
        queue.update(1.5, &mut log);
        assert_eq!(log, ["first"]);
        queue.update(0.5, &mut log);
        assert_eq!(log, ["first", "second"]);
    }

    #[test]
    fn test_equal_due_times_all_run() {
        let mut queue: UpdateQueue<Vec<u32>> = UpdateQueue::new();
        let mut log = Vec::new();

        for i in 0..10u32 {
            queue.push(1.0, move |l: &mut Vec<u32>, _| l.push(i));
        }

        queue.update(1.0, &mut log);
        let mut sorted = log.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_negative_timeout_clamped() {
        let mut queue: UpdateQueue<Log> = UpdateQueue::new();
        let mut log = Log::new();

        queue.push(-5.0, |l: &mut Log, _| l.push("now"));
        queue.update(0.0, &mut log);
        assert_eq!(log, ["now"]);
    }

    #[test]
    fn test_clock_accumulates() {
        let mut queue: UpdateQueue<()> = UpdateQueue::new();
        queue.update(0.25, &mut ());
        queue.update(0.75, &mut ());
        assert!((queue.clock() - 1.0).abs() < f64::EPSILON);
    }
}
