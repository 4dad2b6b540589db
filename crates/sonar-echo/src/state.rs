//! Cycle state shared between the main loop and the interrupt producers.
//!
//! Each field has exactly one writer. The edge-capture callback writes `start`
//! and `end`, the timeout callback writes `fired`, and the main loop writes
//! `generation` and otherwise only reads (apart from the reset of the
//! timestamps that happens before every trigger).
//!
//! The timeout flag is not a plain boolean: the alarm stores the generation
//! of the cycle it was armed for, and the cycle counts as timed out only while
//! that matches the current generation. An alarm that fires after its cycle
//! was released therefore cannot leak into the next one.

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::Mutex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cycle::Snapshot;
use crate::hal::MonotonicClock;

/// IRQ event bit for a falling edge.
pub const EVENT_EDGE_FALL: u32 = 0x4;

/// IRQ event bit for a rising edge.
pub const EVENT_EDGE_RISE: u32 = 0x8;

/// Transition observed on the echo line.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Echo line went high: the burst left the sensor.
    Rising,
    /// Echo line went low: the reflection came back.
    Falling,
}

impl Edge {
    /// Decode a GPIO IRQ event mask.
    ///
    /// Only a mask with exactly one of [`EVENT_EDGE_RISE`] or
    /// [`EVENT_EDGE_FALL`] set is recognised; anything else yields `None`.
    pub const fn from_event_mask(events: u32) -> Option<Edge> {
        match events {
            EVENT_EDGE_FALL => Some(Edge::Falling),
            EVENT_EDGE_RISE => Some(Edge::Rising),
            _ => None,
        }
    }
}

/// Echo timestamps and the timeout flag of the active cycle.
///
/// Meant to live in a `static` so both interrupt handlers can reach it:
///
/// ```
/// use sonar_echo::EchoState;
///
/// static ECHO: EchoState = EchoState::new();
/// ```
#[derive(Debug)]
pub struct EchoState {
    /// Rising edge timestamp (µs).
    start: Mutex<Cell<Option<u64>>>,
    /// Falling edge timestamp (µs).
    end: Mutex<Cell<Option<u64>>>,
    /// Current cycle. Never 0.
    generation: AtomicU32,
    /// Generation of the last alarm that fired.
    fired: AtomicU32,
    #[cfg(test)]
    late_fall: Mutex<Cell<Option<u64>>>,
}

impl EchoState {
    /// Create an empty state: no timestamps, not timed out.
    pub const fn new() -> Self {
        EchoState {
            start: Mutex::new(Cell::new(None)),
            end: Mutex::new(Cell::new(None)),
            generation: AtomicU32::new(1),
            fired: AtomicU32::new(0),
            #[cfg(test)]
            late_fall: Mutex::new(Cell::new(None)),
        }
    }

    /// Edge capture callback.
    ///
    /// Records `at_us` into the slot owned by `edge`. Runs in interrupt
    /// context: a single store inside a critical section, nothing else.
    pub fn on_edge(&self, edge: Edge, at_us: u64) {
        let slot = match edge {
            Edge::Rising => &self.start,
            Edge::Falling => &self.end,
        };
        critical_section::with(|cs| slot.borrow(cs).set(Some(at_us)));
    }

    /// Edge capture callback that stamps the edge with `clock`.
    pub fn capture<C: MonotonicClock + ?Sized>(&self, edge: Edge, clock: &C) {
        self.on_edge(edge, clock.now_us());
    }

    /// Edge capture callback taking a raw IRQ event mask.
    ///
    /// Unknown masks are ignored. Returns the decoded edge, if any.
    pub fn on_event_mask<C: MonotonicClock + ?Sized>(
        &self,
        events: u32,
        clock: &C,
    ) -> Option<Edge> {
        let edge = Edge::from_event_mask(events)?;
        self.capture(edge, clock);
        Some(edge)
    }

    /// Whether the timeout alarm of the current cycle has fired.
    pub fn timed_out(&self) -> bool {
        self.fired.load(Ordering::Acquire) == self.generation.load(Ordering::Acquire)
    }

    fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }

    fn fire_timeout(&self, generation: u32) {
        self.fired.store(generation, Ordering::Release);
    }

    /// Clears both timestamps and starts a new generation, which also clears
    /// the timeout flag.
    ///
    /// Must happen before the trigger so that edges of the new cycle can
    /// never be overwritten by the reset.
    pub(crate) fn reset(&self) {
        critical_section::with(|cs| {
            self.start.borrow(cs).set(None);
            self.end.borrow(cs).set(None);
        });
        let next = self.generation().wrapping_add(1).max(1);
        self.generation.store(next, Ordering::Release);
    }

    /// Delivers a falling edge at `at_us` during the next snapshot that reads
    /// no `end`, after that read has happened.
    #[cfg(test)]
    pub(crate) fn fall_after_next_miss(&self, at_us: u64) {
        critical_section::with(|cs| self.late_fall.borrow(cs).set(Some(at_us)));
    }

    #[cfg(test)]
    fn deliver_late_fall(&self, missed: bool) {
        if missed {
            if let Some(at) = critical_section::with(|cs| self.late_fall.borrow(cs).take()) {
                self.on_edge(Edge::Falling, at);
            }
        }
    }

    /// Copy of all three fields.
    ///
    /// `end` is read before `timed_out` so that an echo which lands between
    /// the two loads is still seen by the next snapshot.
    pub fn snapshot(&self) -> Snapshot {
        let (start, end) =
            critical_section::with(|cs| (self.start.borrow(cs).get(), self.end.borrow(cs).get()));
        let timed_out = self.timed_out();
        #[cfg(test)]
        self.deliver_late_fall(end.is_none());
        Snapshot {
            start,
            end,
            timed_out,
        }
    }
}

impl Default for EchoState {
    fn default() -> Self {
        EchoState::new()
    }
}

/// The timeout callback handed to a [`crate::DeadlineTimer`].
///
/// Plays the role of the alarm's user data: the only thing it can do is raise
/// the timeout flag of the state it was created from, and only for the cycle
/// that was current when it was created.
#[derive(Debug, Clone, Copy)]
pub struct AlarmTarget {
    state: &'static EchoState,
    generation: u32,
}

impl AlarmTarget {
    /// Bind an alarm target to the current cycle of `state`.
    pub fn new(state: &'static EchoState) -> Self {
        AlarmTarget {
            state,
            generation: state.generation(),
        }
    }

    /// Timeout callback: raise the flag and return.
    ///
    /// Has no visible effect once `state` has moved on to a later cycle.
    pub fn fire(&self) {
        self.state.fire_timeout(self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClock(u64);

    impl MonotonicClock for FixedClock {
        fn now_us(&self) -> u64 {
            self.0
        }
    }

    fn leak_state() -> &'static EchoState {
        Box::leak(Box::new(EchoState::new()))
    }

    #[test]
    fn test_new_state_is_unset() {
        let state = EchoState::new();
        assert_eq!(
            state.snapshot(),
            Snapshot {
                start: None,
                end: None,
                timed_out: false
            }
        );
    }

    #[test]
    fn test_edges_write_their_own_slot() {
        let state = EchoState::new();
        state.on_edge(Edge::Rising, 100);
        assert_eq!(state.snapshot().start, Some(100));
        assert_eq!(state.snapshot().end, None);

        state.on_edge(Edge::Falling, 700);
        assert_eq!(state.snapshot().start, Some(100));
        assert_eq!(state.snapshot().end, Some(700));
    }

    #[test]
    fn test_capture_uses_clock() {
        let state = EchoState::new();
        state.capture(Edge::Falling, &FixedClock(42));
        assert_eq!(state.snapshot().end, Some(42));
    }

    #[test]
    fn test_event_mask_decoding() {
        assert_eq!(Edge::from_event_mask(0x8), Some(Edge::Rising));
        assert_eq!(Edge::from_event_mask(0x4), Some(Edge::Falling));
        assert_eq!(Edge::from_event_mask(0x4 | 0x8), None);
        assert_eq!(Edge::from_event_mask(0x1), None);
        assert_eq!(Edge::from_event_mask(0), None);
    }

    #[test]
    fn test_unknown_event_mask_is_ignored() {
        let state = EchoState::new();
        assert_eq!(state.on_event_mask(0x2, &FixedClock(5)), None);
        assert_eq!(state.snapshot().start, None);
        assert_eq!(state.snapshot().end, None);

        assert_eq!(state.on_event_mask(0x8, &FixedClock(5)), Some(Edge::Rising));
        assert_eq!(state.snapshot().start, Some(5));
    }

    #[test]
    fn test_alarm_target_sets_flag() {
        let state = leak_state();
        let target = AlarmTarget::new(state);
        assert!(!state.timed_out());
        target.fire();
        assert!(state.timed_out());
        // Firing twice is harmless.
        target.fire();
        assert!(state.timed_out());
    }

    #[test]
    fn test_reset_clears_everything() {
        let state = leak_state();
        state.on_edge(Edge::Rising, 1);
        state.on_edge(Edge::Falling, 2);
        AlarmTarget::new(state).fire();

        state.reset();
        assert_eq!(state.snapshot(), Snapshot::default());
    }

    #[test]
    fn test_stale_alarm_does_not_time_out_next_cycle() {
        let state = leak_state();
        let previous = AlarmTarget::new(state);
        state.reset();

        previous.fire();
        assert!(!state.timed_out());

        AlarmTarget::new(state).fire();
        assert!(state.timed_out());
    }

    #[test]
    fn test_late_fall_lands_between_reads() {
        let state = leak_state();
        state.fall_after_next_miss(700);

        // The first read misses the edge, the second one sees it.
        assert_eq!(state.snapshot().end, None);
        assert_eq!(state.snapshot().end, Some(700));
    }

    #[test]
    fn test_producers_on_other_threads() {
        let state = leak_state();
        let rise = std::thread::spawn(move || state.on_edge(Edge::Rising, 10));
        let fall = std::thread::spawn(move || state.on_edge(Edge::Falling, 20));
        rise.join().unwrap();
        fall.join().unwrap();
        let snap = state.snapshot();
        assert_eq!(snap.start, Some(10));
        assert_eq!(snap.end, Some(20));
        assert!(!snap.timed_out);
    }
}
