// Weather ML Forecast API v0.1
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use weather_ml_api::config::AppConfig;
use weather_ml_api::routes::{self, weather::AppState};
use weather_ml_api::services::openweather::OpenWeatherClient;
use weather_ml_api::services::predictor::TemperaturePredictor;
use weather_ml_api::{errors, services};

/// Weather ML Forecast API — OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Weather ML Forecast API",
        version = "0.1.0",
        description = "Current conditions and a five-day forecast from OpenWeatherMap, \
            summarised per day and augmented with a temperature estimate from a \
            random-forest model trained on historical weather records.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Weather", description = "Current conditions and daily forecast"),
    ),
    paths(
        routes::health::health_check,
        routes::weather::get_weather,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::weather::WeatherResponse,
            services::aggregator::CurrentConditions,
            services::aggregator::DailySummary,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_ml_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Load model artifacts once; a missing model only disables estimates
    let predictor = TemperaturePredictor::load(
        Path::new(&config.model_path),
        Path::new(&config.scaler_path),
    );

    let app_state = AppState {
        client: OpenWeatherClient::new(&config.openweather_api_key, &config.openweather_base_url),
        predictor: Arc::new(predictor),
    };

    // CORS — read-only API, restrict methods to GET
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/weather", get(routes::weather::get_weather))
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
