// ============================================================================
// TRANSITION CONTROLLER
// ============================================================================
//
// Owns every timer of one gauge. The host calls `tick` from its event loop;
// snapshots and pulses go out over a single channel in the order they happen.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::config::GaugeConfig;
use crate::counter::CounterAnimator;
use crate::error::GaugeResult;
use crate::pulse::{PulseEmitter, PulseEvent};
use crate::scale::BreakpointScale;
use crate::timer::{Scheduler, TimerHandle, TimerKind};

/// What the view draws. Angle and progress are targets; easing the needle
/// toward them is up to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeState {
    pub needle_angle: f64,
    pub progress: f64,
    pub displayed_value: f64,
    pub is_animating: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GaugeEvent {
    State(GaugeState),
    Pulse(PulseEvent),
}

/// Runs once the startup sweep is back at zero, after its pulses stopped.
pub type SweepCallback = Box<dyn FnOnce(&mut TransitionController, Instant)>;

enum SweepPhase {
    NotRun,
    Running {
        timer: TimerHandle,
        on_complete: SweepCallback,
    },
    Done,
}

pub struct TransitionController {
    config: GaugeConfig,
    scale: BreakpointScale,
    timers: Scheduler,
    pulses: PulseEmitter,
    counter: CounterAnimator,
    state: GaugeState,
    requested_value: f64,
    pulse_stop: Option<TimerHandle>,
    sweep: SweepPhase,
    events: Sender<GaugeEvent>,
}

impl TransitionController {
    /// Validates `config` and returns the controller with the receiving end
    /// of its event stream.
    pub fn new(config: GaugeConfig) -> GaugeResult<(Self, Receiver<GaugeEvent>)> {
        let scale = config.validate()?;
        let (events, receiver) = mpsc::channel();
        let state = GaugeState {
            needle_angle: config.start_angle,
            progress: 0.0,
            displayed_value: 0.0,
            is_animating: false,
        };
        let controller = Self {
            counter: CounterAnimator::new(config.frame_interval),
            config,
            scale,
            timers: Scheduler::new(),
            pulses: PulseEmitter::new(),
            state,
            requested_value: 0.0,
            pulse_stop: None,
            sweep: SweepPhase::NotRun,
            events,
        };
        Ok((controller, receiver))
    }

    // ------------------------------------------------------------------------
    // Value changes
    // ------------------------------------------------------------------------

    /// Moves the gauge to `value`.
    ///
    /// The needle target is clamped to `[0, max_value]`; the readout counts
    /// to the unclamped value so it can show overflow. A transition already
    /// in flight is replaced: its pulses, counter and pending pulse stop are
    /// cancelled before anything new is armed. While the startup sweep runs
    /// the value is only recorded, see [`Self::requested_value`].
    pub fn set_value(&mut self, value: f64, now: Instant) {
        if value.is_nan() {
            warn!("ignoring NaN gauge value");
            return;
        }
        let target = value.max(0.0);
        self.requested_value = target;

        if matches!(self.sweep, SweepPhase::Running { .. }) {
            debug!(value = target, "value deferred until the startup sweep completes");
            return;
        }

        let clamped = target.min(self.config.max_value);
        let progress = self.scale.progress_for(clamped);
        let needle_angle = self.config.angle_for(progress);
        let duration = self.config.animation_duration;

        if let Some(previous) = self.pulse_stop.take() {
            self.timers.cancel(previous);
        }
        self.pulses.start(self.config.racing_cadence, now, &mut self.timers);
        self.pulse_stop = Some(self.timers.once(now + duration, TimerKind::PulseStop));
        self.counter
            .animate(self.state.displayed_value, target, duration, now, &mut self.timers);

        debug!(value = target, progress, needle_angle, "gauge transition started");
        self.publish_state(GaugeState {
            needle_angle,
            progress,
            is_animating: true,
            ..self.state
        });
    }

    // ------------------------------------------------------------------------
    // Startup sweep
    // ------------------------------------------------------------------------

    /// Flies the needle to full scale, holds for the configured pause, then
    /// drops it back to zero. `on_complete` runs after the sweep's pulses
    /// have stopped and `is_animating` is false.
    ///
    /// Runs once per controller; returns `false` without doing anything on
    /// later calls unless [`Self::reset_startup_sweep`] was called.
    pub fn perform_startup_sweep<F>(&mut self, now: Instant, on_complete: F) -> bool
    where
        F: FnOnce(&mut TransitionController, Instant) + 'static,
    {
        if !matches!(self.sweep, SweepPhase::NotRun) {
            debug!("startup sweep already performed");
            return false;
        }

        self.counter.cancel(&mut self.timers);
        if let Some(previous) = self.pulse_stop.take() {
            self.timers.cancel(previous);
        }
        self.pulses.start(self.config.bouncy_cadence, now, &mut self.timers);
        let timer = self
            .timers
            .once(now + self.config.startup_sweep_pause, TimerKind::SweepReturn);
        self.sweep = SweepPhase::Running {
            timer,
            on_complete: Box::new(on_complete),
        };

        debug!("startup sweep to full scale");
        self.publish_state(GaugeState {
            needle_angle: self.config.end_angle(),
            progress: 1.0,
            displayed_value: self.config.max_value,
            is_animating: true,
        });
        true
    }

    /// Allows another startup sweep. Has no effect while one is running.
    pub fn reset_startup_sweep(&mut self) {
        if matches!(self.sweep, SweepPhase::Done) {
            self.sweep = SweepPhase::NotRun;
        }
    }

    pub fn has_performed_startup_sweep(&self) -> bool {
        !matches!(self.sweep, SweepPhase::NotRun)
    }

    fn finish_sweep(&mut self, handle: TimerHandle, now: Instant) {
        let on_complete = match std::mem::replace(&mut self.sweep, SweepPhase::Done) {
            SweepPhase::Running { timer, on_complete } if timer == handle => on_complete,
            other => {
                self.sweep = other;
                return;
            }
        };

        debug!("startup sweep back to zero");
        self.publish_state(GaugeState {
            needle_angle: self.config.start_angle,
            progress: 0.0,
            displayed_value: 0.0,
            is_animating: true,
        });

        self.pulses.stop(&mut self.timers);
        self.publish_state(GaugeState {
            is_animating: false,
            ..self.state
        });
        on_complete(self, now);
    }

    // ------------------------------------------------------------------------
    // Driving
    // ------------------------------------------------------------------------

    /// Fires every timer due at `now`, in deadline order. Returns how many
    /// fired.
    pub fn tick(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        while let Some((handle, kind)) = self.timers.pop_due(now) {
            fired += 1;
            match kind {
                TimerKind::Pulse => {
                    if let Some(pulse) = self.pulses.fire(handle) {
                        self.publish(GaugeEvent::Pulse(pulse));
                    }
                }
                TimerKind::CounterFrame => {
                    if let Some(update) = self.counter.fire(handle, now, &mut self.timers) {
                        self.publish_state(GaugeState {
                            displayed_value: update.value,
                            ..self.state
                        });
                    }
                }
                TimerKind::PulseStop => {
                    if self.pulse_stop == Some(handle) {
                        self.pulse_stop = None;
                        self.pulses.stop(&mut self.timers);
                        self.publish_state(GaugeState {
                            is_animating: false,
                            ..self.state
                        });
                    }
                }
                TimerKind::SweepReturn => self.finish_sweep(handle, now),
            }
        }
        fired
    }

    /// Earliest instant at which `tick` has work, if any timer is live.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Cancels every pulse, counter frame and pending step, leaving the
    /// gauge where it is. A sweep in progress ends without its callback.
    pub fn halt(&mut self) {
        self.pulses.stop(&mut self.timers);
        self.counter.cancel(&mut self.timers);
        self.pulse_stop = None;
        if matches!(self.sweep, SweepPhase::Running { .. }) {
            self.sweep = SweepPhase::Done;
        }
        let released = self.timers.clear();
        if released > 0 {
            trace!(released, "released gauge timers");
        }
        if self.state.is_animating {
            self.publish_state(GaugeState {
                is_animating: false,
                ..self.state
            });
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn state(&self) -> GaugeState {
        self.state
    }

    pub fn is_animating(&self) -> bool {
        self.state.is_animating
    }

    /// Last value passed to [`Self::set_value`], after the non-negative
    /// clamp. Useful for re-applying a value that arrived mid-sweep.
    pub fn requested_value(&self) -> f64 {
        self.requested_value
    }

    pub fn config(&self) -> &GaugeConfig {
        &self.config
    }

    pub fn scale(&self) -> &BreakpointScale {
        &self.scale
    }

    pub fn is_pulsing(&self) -> bool {
        self.pulses.is_running()
    }

    pub fn is_counting(&self) -> bool {
        self.counter.is_running()
    }

    /// Number of live timers of every kind.
    pub fn live_timers(&self) -> usize {
        self.timers.len()
    }

    fn publish_state(&mut self, state: GaugeState) {
        self.state = state;
        self.publish(GaugeEvent::State(state));
    }

    fn publish(&self, event: GaugeEvent) {
        if self.events.send(event).is_err() {
            trace!("gauge view has gone away; event dropped");
        }
    }
}

impl Drop for TransitionController {
    fn drop(&mut self) {
        self.pulses.stop(&mut self.timers);
        self.counter.cancel(&mut self.timers);
        self.timers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn drain(receiver: &Receiver<GaugeEvent>) -> Vec<GaugeEvent> {
        receiver.try_iter().collect()
    }

    #[test]
    fn set_value_publishes_the_target_angle_immediately() {
        let t0 = Instant::now();
        let (mut gauge, events) = TransitionController::new(GaugeConfig::default()).unwrap();
        gauge.set_value(5000.0, t0);

        let state = gauge.state();
        assert!(state.is_animating);
        assert!((state.progress - 2.0 / 6.0).abs() < 1e-12);
        assert!((state.needle_angle - (161.04 + 217.92 / 3.0)).abs() < 1e-9);
        assert_eq!(state.displayed_value, 0.0);
        assert_eq!(drain(&events), vec![GaugeEvent::State(state)]);
    }

    #[test]
    fn overflow_pins_the_needle_but_not_the_readout() {
        let t0 = Instant::now();
        let (mut gauge, _events) = TransitionController::new(GaugeConfig::default()).unwrap();
        gauge.set_value(150_000.0, t0);
        assert_eq!(gauge.state().progress, 1.0);

        gauge.tick(t0 + ms(2000));
        assert_eq!(gauge.state().displayed_value, 150_000.0);
    }

    #[test]
    fn negative_and_nan_values_are_handled_defensively() {
        let t0 = Instant::now();
        let (mut gauge, events) = TransitionController::new(GaugeConfig::default()).unwrap();
        gauge.set_value(f64::NAN, t0);
        assert!(drain(&events).is_empty());
        assert!(!gauge.is_animating());

        gauge.set_value(-20.0, t0);
        assert_eq!(gauge.state().progress, 0.0);
        assert_eq!(gauge.requested_value(), 0.0);
    }

    #[test]
    fn pulses_stop_after_the_animation_duration() {
        let t0 = Instant::now();
        let (mut gauge, events) = TransitionController::new(GaugeConfig::default()).unwrap();
        gauge.set_value(1000.0, t0);

        for at in (10..1500).step_by(10) {
            gauge.tick(t0 + ms(at));
        }
        assert!(gauge.is_pulsing());
        assert!(gauge.is_animating());

        gauge.tick(t0 + ms(1500));
        assert!(!gauge.is_pulsing());
        assert!(!gauge.is_animating());

        let pulses = drain(&events)
            .into_iter()
            .filter(|e| matches!(e, GaugeEvent::Pulse(_)))
            .count();
        assert!((9..=10).contains(&pulses), "{pulses} pulses");

        gauge.tick(t0 + ms(1600));
        assert_eq!(gauge.live_timers(), 0);
        assert_eq!(gauge.state().displayed_value, 1000.0);
    }

    #[test]
    fn halt_releases_everything() {
        let t0 = Instant::now();
        let (mut gauge, _events) = TransitionController::new(GaugeConfig::default()).unwrap();
        gauge.set_value(40_000.0, t0);
        assert!(gauge.live_timers() > 0);

        gauge.halt();
        assert_eq!(gauge.live_timers(), 0);
        assert!(!gauge.is_animating());
        assert_eq!(gauge.tick(t0 + ms(5000)), 0);
    }

    #[test]
    fn sweep_runs_once_until_reset() {
        let t0 = Instant::now();
        let (mut gauge, _events) = TransitionController::new(GaugeConfig::default()).unwrap();
        assert!(gauge.perform_startup_sweep(t0, |_, _| {}));
        assert!(!gauge.perform_startup_sweep(t0, |_, _| {}));

        // still running: reset is ignored
        gauge.reset_startup_sweep();
        gauge.tick(t0 + ms(900));
        assert!(!gauge.perform_startup_sweep(t0 + ms(900), |_, _| {}));

        gauge.reset_startup_sweep();
        assert!(gauge.perform_startup_sweep(t0 + ms(1000), |_, _| {}));
    }

    #[test]
    fn rejects_invalid_configuration() {
        let config = GaugeConfig::builder().max_value(0.0).build();
        assert!(TransitionController::new(config).is_err());
    }
}
