// ============================================================================
// VALUE FORMATTING
// ============================================================================

/// Values above this are shown as "at least N thousand".
const OVERFLOW_THRESHOLD: f64 = 100_000.0;
const THOUSAND: f64 = 1_000.0;
/// Fractions smaller than this are not worth a decimal place.
const FRACTION_CUTOFF: f64 = 0.1;

/// Text for the centre readout.
///
/// `999` stays `"999"`, `1500` becomes `"1.5k"`, anything over 100 000 is
/// floored to whole thousands with a `k+` suffix.
pub fn format_display_value(value: f64) -> String {
    // also folds -0.0 into "0"
    let value = if value > 0.0 { value } else { 0.0 };

    if value > OVERFLOW_THRESHOLD {
        format!("{:.0}k+", (value / THOUSAND).floor())
    } else if value >= THOUSAND {
        let thousands = value / THOUSAND;
        if thousands.fract() < FRACTION_CUTOFF {
            format!("{:.0}k", thousands.trunc())
        } else {
            format!("{:.1}k", thousands)
        }
    } else if value.fract() < FRACTION_CUTOFF {
        format!("{:.0}", value.trunc())
    } else {
        format!("{:.1}", value)
    }
}

/// Text for a label printed next to a scale breakpoint.
pub fn format_scale_label(value: f64) -> String {
    if value >= OVERFLOW_THRESHOLD {
        "100k+".to_string()
    } else if value >= THOUSAND {
        format!("{}k", (value / THOUSAND) as i64)
    } else if value > 0.0 {
        format!("{}", value as i64)
    } else {
        "0".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readout_examples() {
        assert_eq!(format_display_value(0.0), "0");
        assert_eq!(format_display_value(999.0), "999");
        assert_eq!(format_display_value(1000.0), "1k");
        assert_eq!(format_display_value(1500.0), "1.5k");
        assert_eq!(format_display_value(150_000.0), "150k+");
    }

    #[test]
    fn readout_drops_insignificant_fractions() {
        assert_eq!(format_display_value(12.04), "12");
        assert_eq!(format_display_value(12.5), "12.5");
        assert_eq!(format_display_value(2050.0), "2k");
        assert_eq!(format_display_value(2200.0), "2.2k");
    }

    #[test]
    fn readout_overflow_floors_thousands() {
        assert_eq!(format_display_value(100_000.0), "100k");
        assert_eq!(format_display_value(100_999.0), "100k+");
        assert_eq!(format_display_value(123_900.0), "123k+");
    }

    #[test]
    fn readout_never_prints_negative_zero() {
        assert_eq!(format_display_value(-0.0), "0");
    }

    #[test]
    fn scale_labels() {
        assert_eq!(format_scale_label(0.0), "0");
        assert_eq!(format_scale_label(500.0), "500");
        assert_eq!(format_scale_label(1000.0), "1k");
        assert_eq!(format_scale_label(25_000.0), "25k");
        assert_eq!(format_scale_label(100_000.0), "100k+");
        assert_eq!(format_scale_label(250_000.0), "100k+");
    }
}
