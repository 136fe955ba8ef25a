// ============================================================================
// ERROR TYPES
// ============================================================================

use thiserror::Error;

/// Configuration rules checked when a gauge is built.
///
/// These are programmer errors: a gauge with a bad scale or timing setup is
/// never constructed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("scale needs at least two breakpoints, got {count}")]
    TooFewBreakpoints { count: usize },

    #[error("scale breakpoint {index} is not finite")]
    NonFiniteBreakpoint { index: usize },

    #[error("scale breakpoints must increase: {previous} at {index} is followed by {next}")]
    NonIncreasingBreakpoints { index: usize, previous: f64, next: f64 },

    #[error("max value must be positive and finite, got {0}")]
    InvalidMaxValue(f64),

    #[error("{name} must be longer than zero")]
    ZeroDuration { name: &'static str },

    #[error("{name} pulse intensity {intensity} is outside 0.0..=1.0")]
    InvalidIntensity { name: &'static str, intensity: f64 },

    #[error("{name} angle must be finite, got {value}")]
    NonFiniteAngle { name: &'static str, value: f64 },
}

/// Why a piece of text was not accepted as a gauge value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputRejection {
    #[error("input is empty")]
    Empty,
    #[error("input is not a number")]
    NotANumber,
    #[error("input is not a finite number")]
    NotFinite,
    #[error("input is negative")]
    Negative,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GaugeError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("invalid input {input:?}: {reason}")]
    InvalidInput {
        input: String,
        reason: InputRejection,
    },
}

pub type GaugeResult<T> = Result<T, GaugeError>;
