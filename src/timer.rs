// ============================================================================
// COOPERATIVE TIMERS
// ============================================================================
//
// Every timer lives in one queue owned by the gauge and fires only when the
// owning thread calls `pop_due`. Nothing here sleeps or spawns.

use std::time::{Duration, Instant};

/// Shortest period a repeating timer may have.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// What a timer is for. The owner decides what firing means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// A haptic pulse of the running cadence.
    Pulse,
    /// One frame of the readout counter.
    CounterFrame,
    /// End of the pulse window that follows a value change.
    PulseStop,
    /// The startup sweep's pause at full scale has elapsed.
    SweepReturn,
}

/// Token for a scheduled timer. Ids are never reused, so a handle whose timer
/// was cancelled or has fired can never match a newer timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct Timer {
    handle: TimerHandle,
    due: Instant,
    period: Option<Duration>,
    kind: TimerKind,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    timers: Vec<Timer>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires `kind` once at `due`.
    pub fn once(&mut self, due: Instant, kind: TimerKind) -> TimerHandle {
        self.insert(due, None, kind)
    }

    /// Fires `kind` at `first_due` and every `period` after that until
    /// cancelled.
    pub fn every(&mut self, first_due: Instant, period: Duration, kind: TimerKind) -> TimerHandle {
        self.insert(first_due, Some(period.max(MIN_PERIOD)), kind)
    }

    /// Returns `false` when the handle was already dead.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        self.timers.len() != before
    }

    pub fn is_live(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|t| t.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Drops every timer, returning how many were live.
    pub fn clear(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        count
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.due).min()
    }

    /// Takes the earliest timer due at or before `now`.
    ///
    /// Ties go to the timer created first. A repeating timer is re-armed past
    /// `now`, skipping any periods the caller was too late for, so draining
    /// the queue at one instant fires it at most once.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerHandle, TimerKind)> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(_, t)| (t.due, t.handle))
            .map(|(i, _)| i)?;

        let Timer {
            handle,
            period,
            kind,
            ..
        } = self.timers[index];
        match period {
            Some(period) => {
                let timer = &mut self.timers[index];
                while timer.due <= now {
                    timer.due += period;
                }
            }
            None => {
                self.timers.swap_remove(index);
            }
        }
        Some((handle, kind))
    }

    fn insert(&mut self, due: Instant, period: Option<Duration>, kind: TimerKind) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            handle,
            due,
            period,
            kind,
        });
        handle
    }
}
