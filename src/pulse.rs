// ============================================================================
// PULSE EMITTER
// ============================================================================

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::timer::{Scheduler, TimerHandle, TimerKind};

/// Feel of a pulse, for whatever haptic or visual backend consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HapticStyle {
    Light,
    Medium,
    Heavy,
    Soft,
    Rigid,
}

/// A named periodic pulse pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseCadence {
    pub name: &'static str,
    pub interval: Duration,
    /// Strength in `0.0..=1.0`.
    pub intensity: f64,
    pub style: HapticStyle,
}

impl PulseCadence {
    pub const fn new(
        name: &'static str,
        interval: Duration,
        intensity: f64,
        style: HapticStyle,
    ) -> Self {
        Self {
            name,
            interval,
            intensity,
            style,
        }
    }

    /// Steady ticking while the needle travels to a new value.
    pub const fn racing() -> Self {
        Self::new("racing", Duration::from_millis(150), 0.7, HapticStyle::Light)
    }

    /// Fast, heavy ticking for the startup sweep.
    pub const fn bouncy() -> Self {
        Self::new("bouncy", Duration::from_millis(90), 0.5, HapticStyle::Heavy)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: "pulse interval",
            });
        }
        if !(0.0..=1.0).contains(&self.intensity) {
            return Err(ConfigError::InvalidIntensity {
                name: self.name,
                intensity: self.intensity,
            });
        }
        Ok(())
    }
}

/// One pulse as delivered to the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseEvent {
    pub intensity: f64,
    pub style: HapticStyle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PulseState {
    Idle,
    Running {
        cadence: PulseCadence,
        timer: TimerHandle,
    },
}

/// Emits pulses on one cadence at a time.
#[derive(Debug)]
pub struct PulseEmitter {
    state: PulseState,
}

impl PulseEmitter {
    pub fn new() -> Self {
        Self {
            state: PulseState::Idle,
        }
    }

    /// Switches to `cadence`. A running cadence is cancelled before the new
    /// timer is armed, so two cadences never overlap. The first pulse comes
    /// one interval after `now`.
    pub fn start(
        &mut self,
        cadence: PulseCadence,
        now: Instant,
        timers: &mut Scheduler,
    ) -> TimerHandle {
        self.stop(timers);
        let timer = timers.every(now + cadence.interval, cadence.interval, TimerKind::Pulse);
        debug!(
            cadence = cadence.name,
            interval_ms = cadence.interval.as_millis() as u64,
            "pulses started"
        );
        self.state = PulseState::Running { cadence, timer };
        timer
    }

    /// Cancels the running cadence. Safe to call when idle; returns whether
    /// anything was running.
    pub fn stop(&mut self, timers: &mut Scheduler) -> bool {
        match self.state {
            PulseState::Idle => false,
            PulseState::Running { cadence, timer } => {
                timers.cancel(timer);
                self.state = PulseState::Idle;
                debug!(cadence = cadence.name, "pulses stopped");
                true
            }
        }
    }

    /// Turns a fired pulse timer into an event. Handles of earlier cadences
    /// produce nothing.
    pub fn fire(&self, handle: TimerHandle) -> Option<PulseEvent> {
        match self.state {
            PulseState::Running { cadence, timer } if timer == handle => {
                trace!(cadence = cadence.name, intensity = cadence.intensity, "pulse");
                Some(PulseEvent {
                    intensity: cadence.intensity,
                    style: cadence.style,
                })
            }
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, PulseState::Running { .. })
    }

    pub fn cadence(&self) -> Option<&PulseCadence> {
        match &self.state {
            PulseState::Running { cadence, .. } => Some(cadence),
            PulseState::Idle => None,
        }
    }
}

impl Default for PulseEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Steps time in 10 ms increments up to `until_ms`, collecting pulses.
    fn run(
        emitter: &PulseEmitter,
        timers: &mut Scheduler,
        t0: Instant,
        until_ms: u64,
    ) -> Vec<PulseEvent> {
        let mut pulses = Vec::new();
        for step in (10..=until_ms).step_by(10) {
            while let Some((handle, _)) = timers.pop_due(t0 + ms(step)) {
                pulses.extend(emitter.fire(handle));
            }
        }
        pulses
    }

    #[test]
    fn racing_cadence_pulses_every_interval() {
        let t0 = Instant::now();
        let mut timers = Scheduler::new();
        let mut emitter = PulseEmitter::new();
        emitter.start(PulseCadence::racing(), t0, &mut timers);

        let pulses = run(&emitter, &mut timers, t0, 600);
        assert_eq!(pulses.len(), 4);
        assert!(pulses.iter().all(|p| p.intensity == 0.7 && p.style == HapticStyle::Light));
    }

    #[test]
    fn restarting_replaces_the_previous_cadence() {
        let t0 = Instant::now();
        let mut timers = Scheduler::new();
        let mut emitter = PulseEmitter::new();
        let racing = emitter.start(PulseCadence::racing(), t0, &mut timers);
        let bouncy = emitter.start(PulseCadence::bouncy(), t0, &mut timers);

        assert!(!timers.is_live(racing));
        assert!(timers.is_live(bouncy));
        assert_eq!(timers.len(), 1);
        assert_eq!(emitter.fire(racing), None);
        assert_eq!(emitter.cadence().map(|c| c.name), Some("bouncy"));

        let pulses = run(&emitter, &mut timers, t0, 900);
        assert_eq!(pulses.len(), 10);
        assert!(pulses.iter().all(|p| p.style == HapticStyle::Heavy));
    }

    #[test]
    fn stop_is_idempotent() {
        let t0 = Instant::now();
        let mut timers = Scheduler::new();
        let mut emitter = PulseEmitter::new();
        emitter.start(PulseCadence::bouncy(), t0, &mut timers);

        assert!(emitter.stop(&mut timers));
        assert!(!emitter.stop(&mut timers));
        assert!(!emitter.is_running());
        assert!(timers.is_empty());
        assert!(run(&emitter, &mut timers, t0, 500).is_empty());
    }

    #[test]
    fn cadence_validation() {
        assert!(PulseCadence::racing().validate().is_ok());
        let loud = PulseCadence::new("loud", ms(50), 1.5, HapticStyle::Rigid);
        assert!(matches!(loud.validate(), Err(ConfigError::InvalidIntensity { .. })));
        let stuck = PulseCadence::new("stuck", Duration::ZERO, 0.5, HapticStyle::Soft);
        assert!(matches!(stuck.validate(), Err(ConfigError::ZeroDuration { .. })));
    }
}
