//! Forecast aggregation.
//!
//! Turns the provider's 3-hour forecast samples into at most five daily
//! summaries, and the single "current" sample into a current-conditions
//! record. Each record optionally carries a model-based temperature estimate
//! next to the provider's own value.

use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::helpers::{mean, opt_round_1dp, round_1dp, safe_float, truncated_mean};
use crate::services::predictor::TemperaturePredictor;

/// Maximum number of daily summaries returned per aggregation.
pub const MAX_FORECAST_DAYS: usize = 5;

/// One raw weather sample from the provider.
///
/// Numeric fields are `None` when the provider omitted them or sent something
/// non-numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub condition: String,
}

/// Aggregated statistics for all forecast samples of one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    /// Calendar date (`YYYY-MM-DD`)
    pub date: String,
    /// Timestamp of the first sample of the day
    pub timestamp: String,
    /// Provider temperature of the first sample of the day, in Celsius
    pub api_temp: Option<f64>,
    /// Model-predicted temperature in Celsius (null when the model is unavailable)
    pub ml_temp: Option<f64>,
    /// Most frequent weather description of the day
    pub condition: String,
    /// Mean relative humidity (%), truncated to an integer
    pub humidity: Option<i64>,
    /// Mean pressure (hPa), truncated to an integer
    pub pressure: Option<i64>,
    /// Mean wind speed (m/s), 1 decimal place
    pub wind_speed: Option<f64>,
}

/// Conditions reported by the provider for "now".
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    /// Observation time, UTC (`YYYY-MM-DD HH:MM:SS`); empty if unknown
    pub timestamp: String,
    /// Provider temperature in Celsius
    pub api_temp: Option<f64>,
    /// Model-predicted temperature in Celsius (null when unavailable)
    pub ml_temp: Option<f64>,
    /// Weather description
    pub condition: String,
    /// Relative humidity (%)
    pub humidity: Option<f64>,
    /// Pressure (hPa)
    pub pressure: Option<f64>,
    /// Wind speed (m/s)
    pub wind_speed: Option<f64>,
}

/// Samples of one date, in arrival order.
#[derive(Default)]
struct DayBucket<'a> {
    observations: Vec<&'a Observation>,
}

impl DayBucket<'_> {
    fn values(&self, field: fn(&Observation) -> Option<f64>, name: &str) -> Vec<f64> {
        let values: Vec<f64> = self.observations.iter().filter_map(|o| field(o)).collect();
        let skipped = self.observations.len() - values.len();
        if skipped > 0 {
            tracing::debug!(
                "Excluded {} of {} samples with missing {} on {}",
                skipped,
                self.observations.len(),
                name,
                self.observations[0].timestamp
            );
        }
        values
    }
}

/// Calendar date part of a `YYYY-MM-DD HH:MM:SS` timestamp.
fn date_of(timestamp: &str) -> Option<&str> {
    let date = timestamp.trim().split(' ').next()?;
    (!date.is_empty()).then_some(date)
}

/// Most frequent condition; ties go to the one seen first.
pub fn modal_condition<'a>(conditions: impl IntoIterator<Item = &'a str>) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for c in conditions {
        match counts.iter_mut().find(|(seen, _)| *seen == c) {
            Some((_, n)) => *n += 1,
            None => counts.push((c, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (c, n) in counts {
        if best.map_or(true, |(_, best_n)| n > best_n) {
            best = Some((c, n));
        }
    }
    best.map(|(c, _)| c.to_string()).unwrap_or_default()
}

/// Summarise forecast samples into at most `MAX_FORECAST_DAYS` daily records,
/// ascending by date.
pub fn summarize_forecast(
    observations: &[Observation],
    predictor: Option<&TemperaturePredictor>,
) -> Vec<DailySummary> {
    let mut buckets: BTreeMap<&str, DayBucket> = BTreeMap::new();
    for obs in observations {
        match date_of(&obs.timestamp) {
            Some(date) => buckets.entry(date).or_default().observations.push(obs),
            None => tracing::warn!("Skipping forecast sample without a timestamp"),
        }
    }

    buckets
        .into_iter()
        .take(MAX_FORECAST_DAYS)
        .map(|(date, bucket)| summarize_day(date, &bucket, predictor))
        .collect()
}

fn summarize_day(
    date: &str,
    bucket: &DayBucket,
    predictor: Option<&TemperaturePredictor>,
) -> DailySummary {
    let first = bucket.observations[0];

    let humidity = truncated_mean(&bucket.values(|o| o.humidity, "humidity"));
    let pressure = truncated_mean(&bucket.values(|o| o.pressure, "pressure"));
    let wind_speed = mean(&bucket.values(|o| o.wind_speed, "wind speed")).map(round_1dp);

    let condition = modal_condition(bucket.observations.iter().map(|o| o.condition.as_str()));

    let ml_temp = predictor.and_then(|p| {
        p.predict(
            &first.timestamp,
            safe_float(humidity.map(|h| h as f64)),
            safe_float(pressure.map(|p| p as f64)),
            safe_float(wind_speed),
        )
    });

    DailySummary {
        date: date.to_string(),
        timestamp: first.timestamp.clone(),
        api_temp: opt_round_1dp(first.temperature),
        ml_temp,
        condition,
        humidity,
        pressure,
        wind_speed,
    }
}

/// Build the current-conditions record from the provider's current sample.
pub fn current_conditions(
    observation: Option<&Observation>,
    predictor: Option<&TemperaturePredictor>,
) -> Option<CurrentConditions> {
    let obs = observation?;

    let ml_temp = predictor.and_then(|p| {
        p.predict(
            &obs.timestamp,
            safe_float(obs.humidity),
            safe_float(obs.pressure),
            safe_float(obs.wind_speed),
        )
    });

    Some(CurrentConditions {
        timestamp: obs.timestamp.clone(),
        api_temp: opt_round_1dp(obs.temperature),
        ml_temp,
        condition: obs.condition.clone(),
        humidity: obs.humidity,
        pressure: obs.pressure,
        wind_speed: obs.wind_speed,
    })
}

/// Current conditions plus daily forecast summaries.
pub fn summarize(
    observations: &[Observation],
    current: Option<&Observation>,
    predictor: Option<&TemperaturePredictor>,
) -> (Option<CurrentConditions>, Vec<DailySummary>) {
    (
        current_conditions(current, predictor),
        summarize_forecast(observations, predictor),
    )
}
