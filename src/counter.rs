// ============================================================================
// READOUT COUNTER
// ============================================================================

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::timer::{Scheduler, TimerHandle, TimerKind};

/// Shape of the counter's progress over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// `t² (3 - 2t)`: slow start, slow finish.
    #[default]
    Smoothstep,
    Linear,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Smoothstep => t * t * (3.0 - 2.0 * t),
            Easing::Linear => t,
        }
    }
}

/// A single run of the counter from one value to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: f64,
    pub to: f64,
    pub started_at: Instant,
    pub duration: Duration,
    pub easing: Easing,
}

impl Transition {
    /// Fraction of the duration elapsed at `now`, in `[0, 1]`.
    pub fn fraction_at(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    fn value_for(&self, fraction: f64) -> f64 {
        if fraction >= 1.0 {
            self.to
        } else {
            self.from + (self.to - self.from) * self.easing.apply(fraction)
        }
    }

    pub fn value_at(&self, now: Instant) -> f64 {
        self.value_for(self.fraction_at(now))
    }
}

/// A value produced by one counter frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterUpdate {
    pub value: f64,
    /// Set on the last frame only; its value is exactly the target.
    pub finished: bool,
}

#[derive(Debug, Clone, Copy)]
struct Running {
    transition: Transition,
    timer: TimerHandle,
    last_fraction: f64,
}

/// Frame-driven interpolation for the digital readout.
///
/// Owns at most one transition. Starting a new one drops the old one and its
/// frame timer in the same call.
#[derive(Debug)]
pub struct CounterAnimator {
    frame_interval: Duration,
    easing: Easing,
    running: Option<Running>,
}

impl CounterAnimator {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            frame_interval,
            easing: Easing::default(),
            running: None,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn animate(
        &mut self,
        from: f64,
        to: f64,
        duration: Duration,
        now: Instant,
        timers: &mut Scheduler,
    ) -> TimerHandle {
        if let Some(superseded) = self.cancel(timers) {
            debug!(from = superseded.from, to = superseded.to, "counter transition superseded");
        }
        let timer = timers.every(
            now + self.frame_interval,
            self.frame_interval,
            TimerKind::CounterFrame,
        );
        self.running = Some(Running {
            transition: Transition {
                from,
                to,
                started_at: now,
                duration,
                easing: self.easing,
            },
            timer,
            last_fraction: 0.0,
        });
        debug!(from, to, duration_ms = duration.as_millis() as u64, "counter transition started");
        timer
    }

    /// Stops the running transition, if any, and hands it back.
    pub fn cancel(&mut self, timers: &mut Scheduler) -> Option<Transition> {
        let running = self.running.take()?;
        timers.cancel(running.timer);
        Some(running.transition)
    }

    /// Computes the frame for a fired timer.
    ///
    /// Time never runs backwards inside a transition, even if `now` does.
    /// Once the duration has elapsed the target is returned exactly once and
    /// the frame timer is released.
    pub fn fire(
        &mut self,
        handle: TimerHandle,
        now: Instant,
        timers: &mut Scheduler,
    ) -> Option<CounterUpdate> {
        let running = self.running.as_mut().filter(|r| r.timer == handle)?;
        let fraction = running.transition.fraction_at(now).max(running.last_fraction);
        running.last_fraction = fraction;
        let value = running.transition.value_for(fraction);

        if fraction < 1.0 {
            trace!(value, fraction, "counter frame");
            return Some(CounterUpdate {
                value,
                finished: false,
            });
        }

        timers.cancel(handle);
        self.running = None;
        debug!(value, "counter transition finished");
        Some(CounterUpdate { value, finished: true })
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn transition(&self) -> Option<&Transition> {
        self.running.as_ref().map(|r| &r.transition)
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }
}
