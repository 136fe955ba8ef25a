// ============================================================================
// CRATE CONFIGURATION & IMPORTS
// ============================================================================

pub mod config;
pub mod controller;
pub mod counter;
pub mod error;
pub mod format;
pub mod input;
pub mod pulse;
pub mod scale;
pub mod timer;
pub mod view;

pub use config::{Color, GaugeConfig, ViewConfig};
pub use controller::{GaugeEvent, GaugeState, TransitionController};
pub use counter::{CounterAnimator, CounterUpdate, Easing, Transition};
pub use error::{ConfigError, GaugeError, GaugeResult, InputRejection};
pub use format::{format_display_value, format_scale_label};
pub use input::{is_valid_input, parse_value};
pub use pulse::{HapticStyle, PulseCadence, PulseEmitter, PulseEvent};
pub use scale::{BreakpointScale, DEFAULT_BREAKPOINTS};
pub use view::{GaugeView, ViewError};

// External crate imports
use pixels::{Pixels, SurfaceTexture};
use tracing::{error, info};

// Standard library imports
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

// Window management imports
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

// ============================================================================
// PUBLIC API - MAIN INTERFACE
// ============================================================================

/// Commands a host can feed into a running window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedometerCommand {
    SetValue(f64),
    /// Replays the startup sweep, then returns to the last requested value.
    StartupSweep,
    /// Stops every animation where it stands.
    Halt,
}

/// A speedometer window: configuration plus the value to show first.
#[derive(Debug, Clone)]
pub struct Speedometer {
    gauge: GaugeConfig,
    view: ViewConfig,
    initial_value: Option<f64>,
    startup_sweep: bool,
}

impl Speedometer {
    /// Fails if `gauge` would not produce a working controller.
    pub fn new(gauge: GaugeConfig, view: ViewConfig) -> GaugeResult<Self> {
        gauge.validate()?;
        Ok(Self {
            gauge,
            view,
            initial_value: None,
            startup_sweep: true,
        })
    }

    /// Value to animate to once the window is up.
    pub fn set_value(&mut self, value: f64) {
        self.initial_value = Some(value);
    }

    /// Whether to open with the calibration sweep. On by default.
    pub fn set_startup_sweep(&mut self, enabled: bool) {
        self.startup_sweep = enabled;
    }

    pub fn show(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.run_window(None)
    }

    pub fn show_with_commands(
        &self,
        receiver: Receiver<SpeedometerCommand>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.run_window(Some(receiver))
    }

    fn run_window(
        &self,
        receiver: Option<Receiver<SpeedometerCommand>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let logical_width = self.view.window_width;
        let logical_height = self.view.window_height;

        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(&self.view.title)
            .with_inner_size(LogicalSize::new(
                logical_width as f64,
                logical_height as f64,
            ))
            .with_resizable(false)
            .build(&event_loop)?;

        let window = Arc::new(window);

        let (mut controller, events) = TransitionController::new(self.gauge.clone())?;
        let mut view = GaugeView::new(self.view.clone(), &self.gauge, controller.scale())?;
        self.start(&mut controller, Instant::now());

        let window_clone = window.clone();
        let size = window.inner_size();
        let mut fb_width = size.width as usize;
        let mut fb_height = size.height as usize;
        let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
        let mut pixels = Pixels::new(size.width, size.height, surface_texture)?;

        let target_fps = self.view.max_framerate.max(1.0);
        let frame_duration = Duration::from_secs_f64(1.0 / target_fps);
        let mut last_frame = Instant::now();
        info!(width = fb_width, height = fb_height, "speedometer window open");

        event_loop.run(move |event, window_target| {
            window_target.set_control_flow(ControlFlow::Poll);
            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        controller.halt();
                        info!("speedometer window closed");
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        fb_width = new_size.width as usize;
                        fb_height = new_size.height as usize;
                        let _ = pixels.resize_buffer(new_size.width, new_size.height);
                        let _ = pixels.resize_surface(new_size.width, new_size.height);
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        if let Some(ref receiver) = receiver {
                            while let Ok(command) = receiver.try_recv() {
                                apply_command(&mut controller, command, now);
                            }
                        }
                        controller.tick(now);

                        view.apply_pending(&events);
                        view.update();
                        view.render(pixels.frame_mut(), fb_width, fb_height);
                        if let Err(err) = pixels.render() {
                            error!(%err, "failed to present frame");
                            window_target.exit();
                        }
                    }
                    _ => {}
                },
                Event::AboutToWait => {
                    if last_frame.elapsed() >= frame_duration {
                        window_clone.request_redraw();
                        last_frame = Instant::now();
                    }
                }
                _ => {}
            }
        })?;

        Ok(())
    }

    /// Opening sequence: the sweep (with the initial value queued behind
    /// it), or a plain transition to the initial value.
    fn start(&self, controller: &mut TransitionController, now: Instant) {
        if self.startup_sweep {
            controller.perform_startup_sweep(now, resume_requested_value);
        }
        if let Some(value) = self.initial_value {
            controller.set_value(value, now);
        }
    }
}

// ============================================================================
// COMMAND HANDLING
// ============================================================================

fn apply_command(controller: &mut TransitionController, command: SpeedometerCommand, now: Instant) {
    match command {
        SpeedometerCommand::SetValue(value) => controller.set_value(value, now),
        SpeedometerCommand::StartupSweep => {
            controller.reset_startup_sweep();
            controller.perform_startup_sweep(now, resume_requested_value);
        }
        SpeedometerCommand::Halt => controller.halt(),
    }
}

/// After a sweep the needle sits at zero; send it back to where the host
/// last asked it to be.
fn resume_requested_value(controller: &mut TransitionController, now: Instant) {
    let value = controller.requested_value();
    controller.set_value(value, now);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn rejects_invalid_gauge_config() {
        let gauge = GaugeConfig::builder().scale_breakpoints(vec![0.0]).build();
        assert!(Speedometer::new(gauge, ViewConfig::default()).is_err());
    }

    #[test]
    fn opening_sweep_hands_over_to_the_initial_value() {
        let t0 = Instant::now();
        let mut speedometer =
            Speedometer::new(GaugeConfig::default(), ViewConfig::default()).unwrap();
        speedometer.set_value(25_000.0);
        let (mut controller, _events) = TransitionController::new(GaugeConfig::default()).unwrap();

        speedometer.start(&mut controller, t0);
        assert_eq!(controller.state().progress, 1.0);

        controller.tick(t0 + ms(900));
        let state = controller.state();
        assert!(state.is_animating);
        assert!((state.progress - 4.0 / 6.0).abs() < 1e-12);

        controller.tick(t0 + ms(3000));
        assert_eq!(controller.state().displayed_value, 25_000.0);
    }

    #[test]
    fn commands_drive_the_controller() {
        let t0 = Instant::now();
        let (mut controller, _events) = TransitionController::new(GaugeConfig::default()).unwrap();

        apply_command(&mut controller, SpeedometerCommand::SetValue(1000.0), t0);
        assert!(controller.is_animating());

        apply_command(&mut controller, SpeedometerCommand::Halt, t0 + ms(100));
        assert!(!controller.is_animating());
        assert_eq!(controller.live_timers(), 0);

        apply_command(&mut controller, SpeedometerCommand::StartupSweep, t0 + ms(200));
        assert!(controller.is_animating());
        assert_eq!(controller.state().progress, 1.0);
    }
}
