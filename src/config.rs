// ============================================================================
// GAUGE CONFIGURATION
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use bon::Builder;

use crate::error::ConfigError;
use crate::pulse::PulseCadence;
use crate::scale::{BreakpointScale, DEFAULT_BREAKPOINTS};

/// Timing and geometry of the animation core.
///
/// Angles are in degrees, measured clockwise from 3 o'clock (screen
/// coordinates, y pointing down).
#[derive(Debug, Clone, Builder)]
pub struct GaugeConfig {
    /// Needle angle at the bottom of the scale (bottom left).
    #[builder(default = 161.04)]
    pub start_angle: f64,
    /// Sweep from the bottom to the top of the scale.
    #[builder(default = 217.92)]
    pub total_angle: f64,
    #[builder(default = DEFAULT_BREAKPOINTS.to_vec())]
    pub scale_breakpoints: Vec<f64>,
    /// Needle position is clamped here; the readout may go past it.
    #[builder(default = 100_000.0)]
    pub max_value: f64,
    /// Length of a value change, and of the pulses that accompany it.
    #[builder(default = Duration::from_millis(1500))]
    pub animation_duration: Duration,
    /// How long the startup sweep holds at full scale.
    #[builder(default = Duration::from_millis(900))]
    pub startup_sweep_pause: Duration,
    /// Readout counter tick, roughly 60 Hz.
    #[builder(default = Duration::from_millis(16))]
    pub frame_interval: Duration,
    #[builder(default = PulseCadence::racing())]
    pub racing_cadence: PulseCadence,
    #[builder(default = PulseCadence::bouncy())]
    pub bouncy_cadence: PulseCadence,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GaugeConfig {
    /// Checks every rule and returns the scale the gauge will map through.
    pub fn validate(&self) -> Result<BreakpointScale, ConfigError> {
        for (name, value) in [("start", self.start_angle), ("total", self.total_angle)] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteAngle { name, value });
            }
        }
        if !(self.max_value.is_finite() && self.max_value > 0.0) {
            return Err(ConfigError::InvalidMaxValue(self.max_value));
        }
        if self.animation_duration.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: "animation duration",
            });
        }
        if self.frame_interval.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: "frame interval",
            });
        }
        self.racing_cadence.validate()?;
        self.bouncy_cadence.validate()?;
        BreakpointScale::new(self.scale_breakpoints.clone())
    }

    /// Needle angle for a normalized progress.
    pub fn angle_for(&self, progress: f64) -> f64 {
        self.start_angle + progress * self.total_angle
    }

    pub fn end_angle(&self) -> f64 {
        self.angle_for(1.0)
    }
}

// ============================================================================
// VIEW CONFIGURATION
// ============================================================================

/// Color representation for gauge elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear blend toward `other`; `amount` 0 keeps `self`.
    pub fn mix(self, other: Color, amount: f64) -> Color {
        let amount = amount.clamp(0.0, 1.0);
        let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * amount).round() as u8;
        Color::new(
            channel(self.r, other.r),
            channel(self.g, other.g),
            channel(self.b, other.b),
        )
    }
}

/// Window and drawing settings. Sizes are ratios of the dial's square canvas
/// so the gauge scales with the window.
#[derive(Debug, Clone, Builder)]
pub struct ViewConfig {
    #[builder(default = "Speedometer".to_string())]
    pub title: String,
    #[builder(default = 360)]
    pub window_width: usize,
    #[builder(default = 360)]
    pub window_height: usize,
    #[builder(default = 60.0)]
    pub max_framerate: f64,

    // Layout ratios
    #[builder(default = 0.95)]
    pub background_ratio: f64,
    #[builder(default = 0.475)]
    pub radius_ratio: f64,
    #[builder(default = 0.0125)]
    pub progress_track_offset_ratio: f64,
    #[builder(default = 0.025)]
    pub progress_track_width_ratio: f64,
    #[builder(default = 0.15)]
    pub hub_size_ratio: f64,
    #[builder(default = 0.70)]
    pub needle_length_ratio: f64,
    #[builder(default = 0.012)]
    pub needle_width_ratio: f64,
    #[builder(default = 0.19)]
    pub text_padding_ratio: f64,
    #[builder(default = 0.04)]
    pub scale_text_size_ratio: f64,
    #[builder(default = 18.0)]
    pub scale_label_spacing: f64,
    #[builder(default = 0.08)]
    pub readout_text_size_ratio: f64,

    // Motion
    /// Share of the remaining distance the drawn needle covers per frame.
    #[builder(default = 0.12)]
    pub needle_smoothing: f64,
    /// Share of the hub flash that survives each frame.
    #[builder(default = 0.85)]
    pub pulse_flash_decay: f64,

    /// TrueType/OpenType font for labels and readout. Text is skipped
    /// without one.
    pub font_path: Option<PathBuf>,

    // Colors
    #[builder(default = Color::new(0xf2, 0xf2, 0xf7))]
    pub background_color: Color,
    #[builder(default = Color::new(0x2c, 0x2c, 0x34))]
    pub dial_color: Color,
    #[builder(default = Color::new(0x44, 0x44, 0x50))]
    pub track_color: Color,
    #[builder(default = Color::new(0xff, 0x45, 0x3a))]
    pub progress_color: Color,
    #[builder(default = Color::new(0xff, 0xd6, 0x0a))]
    pub needle_color: Color,
    #[builder(default = Color::new(0x1c, 0x1c, 0x1e))]
    pub hub_color: Color,
    #[builder(default = Color::new(0xff, 0xff, 0xff))]
    pub pulse_color: Color,
    #[builder(default = Color::new(0xe5, 0xe5, 0xea))]
    pub text_color: Color,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::HapticStyle;

    #[test]
    fn defaults_match_the_stock_dial() {
        let config = GaugeConfig::default();
        assert_eq!(config.start_angle, 161.04);
        assert_eq!(config.total_angle, 217.92);
        assert_eq!(config.max_value, 100_000.0);
        assert_eq!(config.animation_duration, Duration::from_millis(1500));
        assert_eq!(config.startup_sweep_pause, Duration::from_millis(900));
        assert_eq!(config.racing_cadence.interval, Duration::from_millis(150));
        assert_eq!(config.bouncy_cadence.interval, Duration::from_millis(90));
        assert_eq!(config.validate().unwrap().breakpoints(), &DEFAULT_BREAKPOINTS);
    }

    #[test]
    fn builder_overrides_cadences() {
        let config = GaugeConfig::builder()
            .racing_cadence(PulseCadence::new(
                "gentle",
                Duration::from_millis(300),
                0.2,
                HapticStyle::Soft,
            ))
            .build();
        assert!(config.validate().is_ok());
        assert_eq!(config.racing_cadence.intensity, 0.2);
    }

    #[test]
    fn rejects_bad_timing_and_range() {
        let zero_max = GaugeConfig::builder().max_value(0.0).build();
        assert_eq!(zero_max.validate(), Err(ConfigError::InvalidMaxValue(0.0)));

        let negative_max = GaugeConfig::builder().max_value(-10.0).build();
        assert!(negative_max.validate().is_err());

        let instant = GaugeConfig::builder().animation_duration(Duration::ZERO).build();
        assert!(matches!(instant.validate(), Err(ConfigError::ZeroDuration { .. })));

        let flat = GaugeConfig::builder().scale_breakpoints(vec![0.0, 0.0]).build();
        assert!(matches!(
            flat.validate(),
            Err(ConfigError::NonIncreasingBreakpoints { .. })
        ));
    }

    #[test]
    fn angle_mapping_spans_the_sweep() {
        let config = GaugeConfig::default();
        assert_eq!(config.angle_for(0.0), 161.04);
        assert!((config.end_angle() - 378.96).abs() < 1e-9);
    }

    #[test]
    fn color_mix() {
        let black = Color::new(0, 0, 0);
        let white = Color::new(255, 255, 255);
        assert_eq!(black.mix(white, 0.0), black);
        assert_eq!(black.mix(white, 1.0), white);
        assert_eq!(black.mix(white, 0.5), Color::new(128, 128, 128));
    }
}
