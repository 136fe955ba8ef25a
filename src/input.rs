// ============================================================================
// INPUT VALIDATION
// ============================================================================

use crate::error::{GaugeError, GaugeResult, InputRejection};

/// Parses user-typed text into a gauge value.
///
/// Surrounding whitespace is ignored. Empty, non-numeric, infinite/NaN and
/// negative input is rejected so that only clean values reach the animation
/// core.
pub fn parse_value(input: &str) -> GaugeResult<f64> {
    let trimmed = input.trim();
    let reject = |reason| GaugeError::InvalidInput {
        input: input.to_string(),
        reason,
    };

    if trimmed.is_empty() {
        return Err(reject(InputRejection::Empty));
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| reject(InputRejection::NotANumber))?;
    if !value.is_finite() {
        return Err(reject(InputRejection::NotFinite));
    }
    if value < 0.0 {
        return Err(reject(InputRejection::Negative));
    }
    Ok(value)
}

/// Whether `input` would be accepted by [`parse_value`]; drives the submit
/// button's enabled state.
pub fn is_valid_input(input: &str) -> bool {
    parse_value(input).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejection(input: &str) -> Option<InputRejection> {
        match parse_value(input) {
            Err(GaugeError::InvalidInput { reason, .. }) => Some(reason),
            _ => None,
        }
    }

    #[test]
    fn accepts_decimal_text() {
        assert_eq!(parse_value("5000").ok(), Some(5000.0));
        assert_eq!(parse_value("  12.5\n").ok(), Some(12.5));
        assert_eq!(parse_value("0").ok(), Some(0.0));
        assert!(is_valid_input("150000"));
    }

    #[test]
    fn rejects_bad_text() {
        assert_eq!(rejection(""), Some(InputRejection::Empty));
        assert_eq!(rejection("   "), Some(InputRejection::Empty));
        assert_eq!(rejection("fast"), Some(InputRejection::NotANumber));
        assert_eq!(rejection("1,000"), Some(InputRejection::NotANumber));
        assert_eq!(rejection("NaN"), Some(InputRejection::NotFinite));
        assert_eq!(rejection("inf"), Some(InputRejection::NotFinite));
        assert_eq!(rejection("-3"), Some(InputRejection::Negative));
        assert!(!is_valid_input("-0.5"));
    }
}
