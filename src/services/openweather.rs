//! OpenWeatherMap 2.5 client.
//!
//! Fetches the 5-day / 3-hour forecast and the current conditions for a named
//! location. See: https://openweathermap.org/forecast5 and
//! https://openweathermap.org/current
//!
//! Parsing is tolerant: a sample with a missing or mistyped field keeps `None`
//! (or `""` for the condition) for that field, and a list entry that is not an
//! object is skipped with a warning. Only a malformed envelope fails.

use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::helpers::numeric_value;
use crate::model::features::TIMESTAMP_FORMAT;
use crate::services::aggregator::Observation;

/// Client for the OpenWeatherMap API.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

/// Forecast samples plus the provider's resolved location name.
#[derive(Debug, Clone)]
pub struct ProviderForecast {
    pub location_name: Option<String>,
    pub observations: Vec<Observation>,
}

// --- OpenWeatherMap JSON response types ---

/// Only the envelope is typed. Entries stay as raw JSON so that one malformed
/// entry degrades to missing fields instead of failing the whole response.
#[derive(Debug, Deserialize)]
struct OwmForecastResponse {
    #[serde(default)]
    list: Vec<Value>,
    city: Option<Value>,
}

/// Read a unix timestamp from a JSON number or a numeric string.
fn unix_seconds(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::String(s) => s.trim().parse().ok(),
        other => other
            .as_i64()
            .or_else(|| numeric_value(Some(other)).map(|f| f as i64)),
    }
}

fn non_empty_str(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Convert one forecast entry or a current-weather body into an observation.
///
/// Returns None only when `sample` is not a JSON object. Every field that is
/// missing or of the wrong type becomes `None` (or `""` for the condition).
fn to_observation(sample: &Value, use_dt_txt: bool) -> Option<Observation> {
    let fields = sample.as_object()?;

    let timestamp = use_dt_txt
        .then(|| non_empty_str(fields.get("dt_txt")))
        .flatten()
        .or_else(|| unix_seconds(fields.get("dt")).map(format_unix_utc))
        .unwrap_or_default();

    let main = fields.get("main");
    let main_field = |name: &str| numeric_value(main.and_then(|m| m.get(name)));
    let condition = fields
        .get("weather")
        .and_then(|w| w.get(0))
        .and_then(|c| c.get("description"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(Observation {
        timestamp,
        temperature: main_field("temp"),
        humidity: main_field("humidity"),
        pressure: main_field("pressure"),
        wind_speed: numeric_value(fields.get("wind").and_then(|w| w.get("speed"))),
        condition,
    })
}

/// Format a unix timestamp as UTC `YYYY-MM-DD HH:MM:SS`; empty if out of range.
fn format_unix_utc(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

impl OpenWeatherClient {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// GET `{base_url}/{endpoint}?q=location&units=metric` and return the JSON body.
    async fn get_json(&self, endpoint: &str, location: &str) -> Result<Value, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("OpenWeather request failed: {}", e))
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "Location '{}' not found",
                location
            )));
        }

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "OpenWeather {} returned HTTP {}",
                endpoint,
                response.status()
            )));
        }

        response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("OpenWeather JSON parse error: {}", e))
        })
    }

    /// Fetch the 5-day / 3-hour forecast for a location.
    pub async fn fetch_forecast(&self, location: &str) -> Result<ProviderForecast, AppError> {
        let raw = self.get_json("forecast", location).await?;
        parse_forecast_response(&raw)
    }

    /// Fetch the current conditions for a location.
    pub async fn fetch_current(&self, location: &str) -> Result<Observation, AppError> {
        let raw = self.get_json("weather", location).await?;
        parse_current_response(&raw)
    }
}

/// Convert a `/forecast` response body into observations.
///
/// Entries keep their provider order. The timestamp comes from `dt_txt`,
/// falling back to the unix `dt`. Entries that are not objects are skipped.
pub fn parse_forecast_response(raw: &Value) -> Result<ProviderForecast, AppError> {
    let response: OwmForecastResponse = serde_json::from_value(raw.clone()).map_err(|e| {
        AppError::ExternalServiceError(format!("OpenWeather forecast structure error: {}", e))
    })?;

    let observations = response
        .list
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            let observation = to_observation(entry, true);
            if observation.is_none() {
                tracing::warn!("Skipping forecast entry {}: not an object", i);
            }
            observation
        })
        .collect();

    Ok(ProviderForecast {
        location_name: non_empty_str(response.city.as_ref().and_then(|c| c.get("name"))),
        observations,
    })
}

/// Convert a `/weather` response body into a single observation.
pub fn parse_current_response(raw: &Value) -> Result<Observation, AppError> {
    to_observation(raw, false).ok_or_else(|| {
        AppError::ExternalServiceError("OpenWeather current response is not an object".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn forecast_json() -> Value {
        json!({
            "cod": "200",
            "list": [
                {
                    "dt": 1748768400,
                    "dt_txt": "2025-06-01 09:00:00",
                    "main": { "temp": 20.04, "humidity": 60, "pressure": 1010 },
                    "wind": { "speed": 2.0 },
                    "weather": [{ "description": "few clouds" }]
                },
                {
                    "dt": 1748779200,
                    "dt_txt": "2025-06-01 12:00:00",
                    "main": { "temp": 22.0, "humidity": "70", "pressure": 1012 },
                    "wind": { "speed": 3.0 },
                    "weather": [{ "description": "light rain" }]
                }
            ],
            "city": { "name": "Zurich" }
        })
    }

    fn current_json() -> Value {
        json!({
            "dt": 1748768400,
            "name": "Zurich",
            "main": { "temp": 18.46, "humidity": 55, "pressure": 1013 },
            "wind": { "speed": 4.2 },
            "weather": [{ "description": "clear sky" }]
        })
    }

    #[test]
    fn test_parse_forecast_response() {
        let forecast = parse_forecast_response(&forecast_json()).unwrap();
        assert_eq!(forecast.location_name.as_deref(), Some("Zurich"));
        assert_eq!(forecast.observations.len(), 2);

        let first = &forecast.observations[0];
        assert_eq!(first.timestamp, "2025-06-01 09:00:00");
        assert_eq!(first.temperature, Some(20.04));
        assert_eq!(first.humidity, Some(60.0));
        assert_eq!(first.pressure, Some(1010.0));
        assert_eq!(first.wind_speed, Some(2.0));
        assert_eq!(first.condition, "few clouds");

        // Numeric strings are accepted.
        assert_eq!(forecast.observations[1].humidity, Some(70.0));
    }

    #[test]
    fn test_parse_forecast_missing_fields() {
        let raw = json!({
            "list": [
                { "dt_txt": "2025-06-01 09:00:00", "main": { "temp": 20.0, "humidity": null } },
                { "dt": 1748768400 }
            ]
        });
        let forecast = parse_forecast_response(&raw).unwrap();
        assert_eq!(forecast.location_name, None);

        let first = &forecast.observations[0];
        assert_eq!(first.humidity, None);
        assert_eq!(first.pressure, None);
        assert_eq!(first.wind_speed, None);
        assert_eq!(first.condition, "");

        // dt fallback when dt_txt is absent
        assert_eq!(forecast.observations[1].timestamp, "2025-06-01 09:00:00");
        assert_eq!(forecast.observations[1].temperature, None);
    }

    #[test]
    fn test_parse_forecast_empty_list() {
        let forecast = parse_forecast_response(&json!({ "cod": "200" })).unwrap();
        assert!(forecast.observations.is_empty());
    }

    #[test]
    fn test_parse_forecast_wrong_shape() {
        let result = parse_forecast_response(&json!({ "list": "nope" }));
        assert!(matches!(result, Err(AppError::ExternalServiceError(_))));
    }

    #[test]
    fn test_parse_forecast_tolerates_malformed_entries() {
        let raw = json!({
            "list": [
                {
                    "dt_txt": "2025-06-01 09:00:00",
                    "main": { "temp": 20.0, "humidity": 60, "pressure": 1010 },
                    "wind": { "speed": 2.0 },
                    "weather": [{ "description": "few clouds" }]
                },
                { "dt_txt": "2025-06-01 12:00:00", "main": { "temp": 21.0 }, "weather": null },
                { "dt": "1748768400", "main": { "temp": 22.0 } },
                { "dt_txt": 5, "main": "hot", "wind": [], "weather": [{ "description": 5 }] },
                "garbage",
                null
            ],
            "city": { "name": 42 }
        });
        let forecast = parse_forecast_response(&raw).unwrap();
        assert_eq!(forecast.location_name, None);
        // Non-object entries are dropped; the rest survive with what they have.
        assert_eq!(forecast.observations.len(), 4);

        let good = &forecast.observations[0];
        assert_eq!(good.temperature, Some(20.0));
        assert_eq!(good.condition, "few clouds");

        let null_weather = &forecast.observations[1];
        assert_eq!(null_weather.temperature, Some(21.0));
        assert_eq!(null_weather.condition, "");

        let string_dt = &forecast.observations[2];
        assert_eq!(string_dt.timestamp, "2025-06-01 09:00:00");
        assert_eq!(string_dt.temperature, Some(22.0));

        let junk = &forecast.observations[3];
        assert_eq!(junk.timestamp, "");
        assert_eq!(junk.temperature, None);
        assert_eq!(junk.wind_speed, None);
        assert_eq!(junk.condition, "");
    }

    #[test]
    fn test_parse_current_response() {
        let current = parse_current_response(&current_json()).unwrap();
        assert_eq!(current.timestamp, "2025-06-01 09:00:00");
        assert_eq!(current.temperature, Some(18.46));
        assert_eq!(current.wind_speed, Some(4.2));
        assert_eq!(current.condition, "clear sky");
    }

    #[test]
    fn test_parse_current_without_dt() {
        let current = parse_current_response(&json!({ "main": { "temp": 1.0 } })).unwrap();
        assert_eq!(current.timestamp, "");
    }

    #[test]
    fn test_parse_current_ignores_dt_txt_and_bad_weather() {
        let raw = json!({
            "dt": "1748768400",
            "dt_txt": "1999-01-01 00:00:00",
            "main": { "temp": 18.0 },
            "weather": { "description": "not a list" }
        });
        let current = parse_current_response(&raw).unwrap();
        assert_eq!(current.timestamp, "2025-06-01 09:00:00");
        assert_eq!(current.condition, "");
        assert!(matches!(
            parse_current_response(&json!([1, 2])),
            Err(AppError::ExternalServiceError(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_forecast_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("q", "Zurich"))
            .and(query_param("appid", "secret"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json()))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new("secret", &server.uri());
        let forecast = client.fetch_forecast("Zurich").await.unwrap();
        assert_eq!(forecast.observations.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_current() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_json()))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new("secret", &format!("{}/", server.uri()));
        let current = client.fetch_current("Zurich").await.unwrap();
        assert_eq!(current.pressure, Some(1013.0));
    }

    #[tokio::test]
    async fn test_fetch_unknown_location() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({ "cod": "404", "message": "city not found" })),
            )
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new("secret", &server.uri());
        let result = client.fetch_forecast("Atlantis").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fetch_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new("bad-key", &server.uri());
        let result = client.fetch_current("Zurich").await;
        assert!(matches!(result, Err(AppError::ExternalServiceError(_))));
    }
}
