//! Feature vector layout shared by training and inference.

use chrono::{Datelike, NaiveDateTime, Timelike};

/// Number of model inputs.
pub const N_FEATURES: usize = 6;

/// Column names in feature-vector order.
pub const FEATURE_NAMES: [&str; N_FEATURES] =
    ["day", "month", "hour", "humidity", "pressure", "wind_speed"];

/// Timestamp format used by the provider and the predictor.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `[day, month, hour, humidity, pressure, wind_speed]`
pub type FeatureVector = [f64; N_FEATURES];

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
}

/// Build the feature vector for one sample.
pub fn feature_vector(
    dt: &NaiveDateTime,
    humidity: f64,
    pressure: f64,
    wind_speed: f64,
) -> FeatureVector {
    [
        f64::from(dt.day()),
        f64::from(dt.month()),
        f64::from(dt.hour()),
        humidity,
        pressure,
        wind_speed,
    ]
}
