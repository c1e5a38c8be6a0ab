use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::routes::weather::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok" when healthy, "degraded" when no model is loaded)
    pub status: String,
    /// API version
    pub version: String,
    /// Whether the temperature model artifacts were loaded
    pub model_loaded: bool,
}

/// Health check endpoint.
///
/// Returns the API status and version. Returns status "degraded" (still 200)
/// when the model is unavailable: forecasts are still served, without
/// model-based estimates.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_loaded = state.predictor.is_available();

    Json(HealthResponse {
        status: if model_loaded {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_loaded,
    })
}
