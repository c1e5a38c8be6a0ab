//! Shared numeric helpers.
//!
//! Two lenient conversions exist because provider data and model inputs have
//! different needs:
//!
//! - `numeric_value`: reads a provider JSON field, keeping "missing" distinct
//!   from zero so aggregation can exclude it from averages.
//! - `safe_float`: collapses a missing or non-finite value to `0.0` right before
//!   it is fed to the regression model.

/// Round an f64 to 1 decimal place.
///
/// Used for temperatures and wind speed, where 0.1°C / 0.1 m/s precision is
/// all the provider reports anyway.
pub fn round_1dp(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Round an optional f64 to 1 decimal place, returning None if input is None.
pub fn opt_round_1dp(v: Option<f64>) -> Option<f64> {
    v.map(round_1dp)
}

/// Coerce a possibly-missing model input to a finite f64.
///
/// Missing values and non-finite values (NaN, ±Inf) become `0.0`. This masks
/// upstream data problems, so it is only applied at the model boundary.
pub fn safe_float(v: Option<f64>) -> f64 {
    match v {
        Some(x) if x.is_finite() => x,
        Some(x) => {
            tracing::warn!("safe_float received non-finite value {}, defaulting to 0", x);
            0.0
        }
        None => 0.0,
    }
}

/// Read a numeric value out of a provider JSON field.
///
/// Accepts JSON numbers and numeric strings. Anything else (null, bool,
/// objects, garbage text, non-finite numbers) yields `None`.
pub fn numeric_value(v: Option<&serde_json::Value>) -> Option<f64> {
    let parsed = match v? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Truncating mean (toward zero) of a slice, or None when the slice is empty.
pub(crate) fn truncated_mean(values: &[f64]) -> Option<i64> {
    mean(values).map(|m| m.trunc() as i64)
}

/// Arithmetic mean of a slice, or None when the slice is empty.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_1dp_normal() {
        assert_eq!(round_1dp(3.14), 3.1);
    }

    #[test]
    fn test_round_1dp_rounds_up() {
        assert_eq!(round_1dp(3.16), 3.2);
    }

    #[test]
    fn test_round_1dp_negative() {
        assert_eq!(round_1dp(-4.66), -4.7);
    }

    #[test]
    fn test_opt_round_1dp() {
        assert_eq!(opt_round_1dp(None), None);
        assert_eq!(opt_round_1dp(Some(2.54)), Some(2.5));
    }

    #[test]
    fn test_safe_float_passthrough() {
        assert_eq!(safe_float(Some(1013.0)), 1013.0);
    }

    #[test]
    fn test_safe_float_missing() {
        assert_eq!(safe_float(None), 0.0);
    }

    #[test]
    fn test_safe_float_nan() {
        assert_eq!(safe_float(Some(f64::NAN)), 0.0);
    }

    #[test]
    fn test_safe_float_infinity() {
        assert_eq!(safe_float(Some(f64::NEG_INFINITY)), 0.0);
    }

    #[test]
    fn test_numeric_value_number() {
        assert_eq!(numeric_value(Some(&json!(65))), Some(65.0));
        assert_eq!(numeric_value(Some(&json!(2.5))), Some(2.5));
    }

    #[test]
    fn test_numeric_value_numeric_string() {
        assert_eq!(numeric_value(Some(&json!(" 1012 "))), Some(1012.0));
    }

    #[test]
    fn test_numeric_value_rejects_garbage() {
        assert_eq!(numeric_value(Some(&json!("humid"))), None);
        assert_eq!(numeric_value(Some(&json!(null))), None);
        assert_eq!(numeric_value(Some(&json!(true))), None);
        assert_eq!(numeric_value(Some(&json!("NaN"))), None);
        assert_eq!(numeric_value(None), None);
    }

    #[test]
    fn test_truncated_mean() {
        assert_eq!(truncated_mean(&[60.0, 70.0]), Some(65));
        assert_eq!(truncated_mean(&[60.0, 61.0]), Some(60));
        assert_eq!(truncated_mean(&[]), None);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[2.0, 3.0]), Some(2.5));
        assert_eq!(mean(&[]), None);
    }
}
