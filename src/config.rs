/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openweather_api_key: String,
    /// Base URL of the OpenWeatherMap 2.5 API (overridable for testing).
    pub openweather_base_url: String,
    pub port: u16,
    /// Location of the persisted regressor artifact.
    pub model_path: String,
    /// Location of the persisted scaler artifact.
    pub scaler_path: String,
}

pub const DEFAULT_OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_MODEL_PATH: &str = "./model.bin";
pub const DEFAULT_SCALER_PATH: &str = "./scaler.bin";

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            openweather_api_key: std::env::var("OPENWEATHER_API_KEY")
                .expect("OPENWEATHER_API_KEY must be set"),
            openweather_base_url: std::env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENWEATHER_BASE_URL.to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            model_path: std::env::var("MODEL_PATH")
                .unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string()),
            scaler_path: std::env::var("SCALER_PATH")
                .unwrap_or_else(|_| DEFAULT_SCALER_PATH.to_string()),
        }
    }
}
