// ============================================================================
// BREAKPOINT SCALE
// ============================================================================

use crate::error::ConfigError;

/// Thresholds of the stock dial: each span between two of them gets an equal
/// slice of the sweep.
pub const DEFAULT_BREAKPOINTS: [f64; 7] = [
    0.0, 1_000.0, 5_000.0, 10_000.0, 25_000.0, 50_000.0, 100_000.0,
];

/// Piecewise-linear mapping from raw values to a normalized dial position.
///
/// A scale with `N` breakpoints has `N - 1` segments, each covering
/// `1 / (N - 1)` of the dial no matter how wide its value range is. This is
/// what lets a single needle show both 500 and 50 000 legibly.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointScale {
    breakpoints: Vec<f64>,
}

impl BreakpointScale {
    /// Builds a scale, rejecting anything that would make a segment empty.
    pub fn new(breakpoints: Vec<f64>) -> Result<Self, ConfigError> {
        check_breakpoints(&breakpoints)?;
        Ok(Self { breakpoints })
    }

    pub fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }

    pub fn segment_count(&self) -> usize {
        self.breakpoints.len() - 1
    }

    pub fn min_value(&self) -> f64 {
        self.breakpoints[0]
    }

    pub fn max_value(&self) -> f64 {
        self.breakpoints[self.breakpoints.len() - 1]
    }

    /// Normalized progress in `[0, 1]` for `value`.
    ///
    /// Values below the first breakpoint pin to 0, values past the last pin
    /// to 1. The segments are validated at construction so no division can
    /// hit a zero-width span.
    pub fn progress_for(&self, value: f64) -> f64 {
        if value.is_nan() || value <= self.min_value() {
            return 0.0;
        }
        let segments = self.segment_count() as f64;
        for (i, pair) in self.breakpoints.windows(2).enumerate() {
            let (lo, hi) = (pair[0], pair[1]);
            if value >= lo && value <= hi {
                let segment_progress = (value - lo) / (hi - lo);
                return (i as f64 + segment_progress) / segments;
            }
        }
        1.0
    }

    /// Dial fraction of every breakpoint, for laying out scale labels.
    pub fn label_positions(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let segments = self.segment_count() as f64;
        self.breakpoints
            .iter()
            .enumerate()
            .map(move |(i, &value)| (i as f64 / segments, value))
    }
}

impl Default for BreakpointScale {
    fn default() -> Self {
        Self {
            breakpoints: DEFAULT_BREAKPOINTS.to_vec(),
        }
    }
}

/// One-shot form of [`BreakpointScale::progress_for`] for callers holding a
/// raw slice. Fails instead of dividing by zero when the slice is malformed.
pub fn progress_for(value: f64, breakpoints: &[f64]) -> Result<f64, ConfigError> {
    check_breakpoints(breakpoints)?;
    let scale = BreakpointScale {
        breakpoints: breakpoints.to_vec(),
    };
    Ok(scale.progress_for(value))
}

fn check_breakpoints(breakpoints: &[f64]) -> Result<(), ConfigError> {
    if breakpoints.len() < 2 {
        return Err(ConfigError::TooFewBreakpoints {
            count: breakpoints.len(),
        });
    }
    if let Some(index) = breakpoints.iter().position(|b| !b.is_finite()) {
        return Err(ConfigError::NonFiniteBreakpoint { index });
    }
    for (index, pair) in breakpoints.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(ConfigError::NonIncreasingBreakpoints {
                index,
                previous: pair[0],
                next: pair[1],
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn endpoints_map_to_zero_and_one() {
        let scale = BreakpointScale::default();
        assert_eq!(scale.progress_for(0.0), 0.0);
        assert_eq!(scale.progress_for(100_000.0), 1.0);
    }

    #[test]
    fn interior_breakpoint_lands_on_its_slice_boundary() {
        let scale = BreakpointScale::default();
        assert!((scale.progress_for(5000.0) - 2.0 / 6.0).abs() < EPSILON);
        assert!((scale.progress_for(25_000.0) - 4.0 / 6.0).abs() < EPSILON);
    }

    #[test]
    fn interpolates_within_a_segment() {
        let scale = BreakpointScale::default();
        // halfway through 1000..5000 is halfway through the second slice
        assert!((scale.progress_for(3000.0) - 1.5 / 6.0).abs() < EPSILON);
        assert!((scale.progress_for(500.0) - 0.5 / 6.0).abs() < EPSILON);
    }

    #[test]
    fn progress_never_decreases() {
        let scale = BreakpointScale::default();
        let mut previous = 0.0;
        let mut value = 0.0;
        while value <= 100_000.0 {
            let progress = scale.progress_for(value);
            assert!(progress >= previous, "{value} went backwards");
            assert!((0.0..=1.0).contains(&progress));
            previous = progress;
            value += 137.0;
        }
    }

    #[test]
    fn out_of_range_values_pin_to_the_ends() {
        let scale = BreakpointScale::default();
        assert_eq!(scale.progress_for(250_000.0), 1.0);
        assert_eq!(scale.progress_for(-5.0), 0.0);
        assert_eq!(scale.progress_for(f64::NAN), 0.0);
    }

    #[test]
    fn rejects_malformed_breakpoints() {
        assert_eq!(
            BreakpointScale::new(vec![10.0]),
            Err(ConfigError::TooFewBreakpoints { count: 1 })
        );
        assert_eq!(
            BreakpointScale::new(vec![0.0, 10.0, 10.0]),
            Err(ConfigError::NonIncreasingBreakpoints {
                index: 1,
                previous: 10.0,
                next: 10.0
            })
        );
        assert_eq!(
            BreakpointScale::new(vec![0.0, f64::INFINITY]),
            Err(ConfigError::NonFiniteBreakpoint { index: 1 })
        );
    }

    #[test]
    fn slice_form_reports_degenerate_segments() {
        assert!(progress_for(5.0, &[0.0, 5.0, 5.0, 10.0]).is_err());
        assert_eq!(progress_for(5.0, &[0.0, 10.0]), Ok(0.5));
    }

    #[test]
    fn label_positions_are_evenly_spaced() {
        let scale = BreakpointScale::new(vec![0.0, 10.0, 100.0]).unwrap();
        let positions: Vec<_> = scale.label_positions().collect();
        assert_eq!(positions, vec![(0.0, 0.0), (0.5, 10.0), (1.0, 100.0)]);
    }
}
