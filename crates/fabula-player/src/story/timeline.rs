//! Timeline — virtual-time timer queue shared by every story controller.
//!
//! Timers are plain values (`cues`) scheduled at an absolute millisecond.
//! Time only moves when the host advances it, so a whole scene transition
//! can be replayed deterministically in tests by advancing in steps.
//!
//! Each scheduled timer gets a `TimerHandle`. Owners keep the handle and
//! cancel it before scheduling a replacement; cues additionally carry the
//! owner's `Generation` so a cue that was already popped for dispatch can
//! still be recognised as stale.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Identifies one scheduled timer. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Ownership token for scheduled work. Bumping it invalidates every cue
/// that captured an older value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// Advance to a fresh generation and return it
    pub fn bump(&mut self) -> Generation {
        self.0 += 1;
        *self
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct Pending<C> {
    cue: C,
    /// Re-arm interval for repeating timers
    repeat_ms: Option<u64>,
}

/// Queue entry: (due time, scheduling order, handle). Ordering on the first
/// two fields gives earliest-first with FIFO ties.
type Slot = Reverse<(u64, u64, TimerHandle)>;

#[derive(Debug)]
pub struct Timeline<C> {
    now_ms: u64,
    next_handle: u64,
    next_seq: u64,
    queue: BinaryHeap<Slot>,
    live: HashMap<TimerHandle, Pending<C>>,
}

impl<C> Default for Timeline<C> {
    fn default() -> Self {
        Self {
            now_ms: 0,
            next_handle: 0,
            next_seq: 0,
            queue: BinaryHeap::new(),
            live: HashMap::new(),
        }
    }
}

impl<C: Clone> Timeline<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Fire `cue` once, `delay_ms` from now
    pub fn after(&mut self, delay_ms: u64, cue: C) -> TimerHandle {
        self.insert(delay_ms, cue, None)
    }

    /// Fire `cue` every `interval_ms` (first time one interval from now)
    pub fn every(&mut self, interval_ms: u64, cue: C) -> TimerHandle {
        let interval = interval_ms.max(1);
        self.insert(interval, cue, Some(interval))
    }

    fn insert(&mut self, delay_ms: u64, cue: C, repeat_ms: Option<u64>) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.push(self.now_ms.saturating_add(delay_ms), handle);
        self.live.insert(handle, Pending { cue, repeat_ms });
        handle
    }

    fn push(&mut self, due_ms: u64, handle: TimerHandle) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse((due_ms, seq, handle)));
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.live.remove(&handle).is_some()
    }

    /// Cancel whatever timer `slot` holds and empty it
    pub fn clear(&mut self, slot: &mut Option<TimerHandle>) {
        if let Some(handle) = slot.take() {
            self.cancel(handle);
        }
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// Number of live timers
    pub fn pending(&self) -> usize {
        self.live.len()
    }

    /// Pop the earliest live timer due at or before `until_ms`, moving the
    /// clock to its due time. Repeating timers are re-armed.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerHandle, C)> {
        loop {
            let Reverse((due_ms, _, handle)) = *self.queue.peek()?;
            if due_ms > until_ms {
                return None;
            }
            self.queue.pop();

            let Some(pending) = self.live.get(&handle) else {
                continue; // cancelled
            };
            let cue = pending.cue.clone();
            match pending.repeat_ms {
                Some(interval) => self.push(due_ms.saturating_add(interval), handle),
                None => {
                    self.live.remove(&handle);
                }
            }
            self.now_ms = self.now_ms.max(due_ms);
            return Some((handle, cue));
        }
    }

    /// Move the clock forward (never backwards) once the queue is drained
    pub fn advance_to(&mut self, ms: u64) {
        self.now_ms = self.now_ms.max(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(tl: &mut Timeline<&'static str>, until: u64) -> Vec<(u64, &'static str)> {
        let mut fired = Vec::new();
        while let Some((_, cue)) = tl.pop_due(until) {
            fired.push((tl.now(), cue));
        }
        tl.advance_to(until);
        fired
    }

    #[test]
    fn fires_in_due_order() {
        let mut tl = Timeline::new();
        tl.after(300, "c");
        tl.after(100, "a");
        tl.after(200, "b");
        assert_eq!(drain(&mut tl, 250), vec![(100, "a"), (200, "b")]);
        assert_eq!(tl.now(), 250);
        assert_eq!(drain(&mut tl, 1000), vec![(300, "c")]);
        assert_eq!(tl.pending(), 0);
    }

    #[test]
    fn ties_keep_scheduling_order() {
        let mut tl = Timeline::new();
        tl.after(50, "first");
        tl.after(50, "second");
        tl.after(0, "zero");
        assert_eq!(
            drain(&mut tl, 50),
            vec![(0, "zero"), (50, "first"), (50, "second")]
        );
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut tl = Timeline::new();
        let h = tl.after(100, "x");
        assert!(tl.is_pending(h));
        assert!(tl.cancel(h));
        assert!(!tl.cancel(h));
        assert!(drain(&mut tl, 500).is_empty());
    }

    #[test]
    fn clear_empties_slot() {
        let mut tl = Timeline::new();
        let mut slot = Some(tl.after(10, "x"));
        tl.clear(&mut slot);
        assert!(slot.is_none());
        assert_eq!(tl.pending(), 0);
    }

    #[test]
    fn repeating_timer_rearms_until_cancelled() {
        let mut tl = Timeline::new();
        let h = tl.every(60, "tick");
        let fired = drain(&mut tl, 200);
        assert_eq!(fired, vec![(60, "tick"), (120, "tick"), (180, "tick")]);
        tl.cancel(h);
        assert!(drain(&mut tl, 1000).is_empty());
    }

    #[test]
    fn timers_scheduled_while_draining_fire_in_same_advance() {
        let mut tl = Timeline::new();
        tl.after(100, "first");
        let mut fired = Vec::new();
        while let Some((_, cue)) = tl.pop_due(500) {
            fired.push((tl.now(), cue));
            if cue == "first" {
                tl.after(100, "chained");
            }
        }
        assert_eq!(fired, vec![(100, "first"), (200, "chained")]);
    }

    #[test]
    fn huge_delay_saturates() {
        let mut tl = Timeline::new();
        tl.after(10, "soon");
        drain(&mut tl, 10);
        tl.after(u64::MAX, "never");
        assert!(drain(&mut tl, 1_000_000).is_empty());
        assert_eq!(tl.pending(), 1);
    }

    #[test]
    fn generation_bump() {
        let mut g = Generation::default();
        let old = g;
        let new = g.bump();
        assert_ne!(old, new);
        assert_eq!(new, g);
        assert_eq!(g.value(), 1);
    }
}
