//! Weather HTTP endpoint.
//!
//! - GET /api/v1/weather?location=NAME

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::errors::{AppError, ErrorResponse};
use crate::services::aggregator::{self, CurrentConditions, DailySummary};
use crate::services::openweather::OpenWeatherClient;
use crate::services::predictor::TemperaturePredictor;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub client: OpenWeatherClient,
    pub predictor: Arc<TemperaturePredictor>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct WeatherQuery {
    /// Location name as understood by OpenWeatherMap (e.g. "Zurich" or "Zurich,CH")
    pub location: Option<String>,
}

/// Current conditions and daily forecast for one location.
#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherResponse {
    /// Resolved location name
    pub location: String,
    /// Current conditions
    pub current: CurrentConditions,
    /// Up to five daily summaries, ascending by date
    pub forecast: Vec<DailySummary>,
}

/// Get current conditions and a 5-day forecast with model-based estimates.
///
/// Each record carries the provider's temperature (`apiTemp`) and the model's
/// estimate (`mlTemp`), which is null when no model is loaded.
#[utoipa::path(
    get,
    path = "/api/v1/weather",
    tag = "Weather",
    params(WeatherQuery),
    responses(
        (status = 200, description = "Current conditions and daily forecast", body = WeatherResponse),
        (status = 400, description = "Location not provided", body = ErrorResponse),
        (status = 404, description = "Unknown location or no forecast data", body = ErrorResponse),
        (status = 502, description = "OpenWeatherMap unreachable or failing", body = ErrorResponse),
    )
)]
pub async fn get_weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherQuery>,
) -> Result<Json<WeatherResponse>, AppError> {
    let location = params
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| AppError::BadRequest("Location not provided".to_string()))?;

    let (forecast, current) = futures::try_join!(
        state.client.fetch_forecast(location),
        state.client.fetch_current(location),
    )?;

    if forecast.observations.is_empty() {
        return Err(AppError::NotFound("No forecast data available".to_string()));
    }

    let predictor = Some(state.predictor.as_ref());
    let (current, daily) = aggregator::summarize(&forecast.observations, Some(&current), predictor);
    let current = current.ok_or_else(|| {
        AppError::InternalError("Current conditions missing after aggregation".to_string())
    })?;

    tracing::debug!(
        "Weather for '{}': {} forecast samples -> {} days",
        location,
        forecast.observations.len(),
        daily.len()
    );

    Ok(Json(WeatherResponse {
        location: forecast
            .location_name
            .unwrap_or_else(|| location.to_string()),
        current,
        forecast: daily,
    }))
}
