//! Model-based temperature estimate.
//!
//! Wraps an optional `FittedModel`. Every failure path (no model, bad
//! timestamp, inference error) is logged and turned into `None`; callers never
//! see an error from here.

use std::path::Path;

use crate::helpers::{round_1dp, safe_float};
use crate::model::features::{feature_vector, parse_timestamp};
use crate::model::{artifacts, FittedModel};

#[derive(Debug, Clone)]
pub struct TemperaturePredictor {
    model: Option<FittedModel>,
}

impl TemperaturePredictor {
    pub fn new(model: FittedModel) -> Self {
        Self { model: Some(model) }
    }

    /// A predictor with no model; every prediction is `None`.
    pub fn unavailable() -> Self {
        Self { model: None }
    }

    /// Load the regressor and scaler artifacts. A missing or unreadable
    /// artifact yields an unavailable predictor rather than an error.
    pub fn load(model_path: &Path, scaler_path: &Path) -> Self {
        match artifacts::load(model_path, scaler_path) {
            Ok(model) => {
                tracing::info!(
                    "Model ({} trees) and scaler loaded from {} / {}",
                    model.regressor.n_estimators(),
                    model_path.display(),
                    scaler_path.display()
                );
                Self::new(model)
            }
            Err(e) => {
                tracing::warn!("Temperature model unavailable: {}", e);
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    /// Predict the temperature for a `YYYY-MM-DD HH:MM:SS` timestamp and the
    /// given conditions, rounded to 1 decimal place.
    pub fn predict(
        &self,
        timestamp: &str,
        humidity: f64,
        pressure: f64,
        wind_speed: f64,
    ) -> Option<f64> {
        let model = self.model.as_ref()?;

        let dt = match parse_timestamp(timestamp) {
            Ok(dt) => dt,
            Err(e) => {
                tracing::warn!("Feature preparation error for '{}': {}", timestamp, e);
                return None;
            }
        };

        let features = feature_vector(
            &dt,
            safe_float(Some(humidity)),
            safe_float(Some(pressure)),
            safe_float(Some(wind_speed)),
        );

        match model.predict(&features) {
            Ok(prediction) => Some(round_1dp(prediction)),
            Err(e) => {
                tracing::warn!("Prediction error for '{}': {}", timestamp, e);
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::model::features::FeatureVector;
    use crate::model::forest::{ForestParams, RandomForestRegressor};
    use crate::model::scaler::StandardScaler;
    use crate::model::FittedModel;

    /// Warm when humid, cool when dry.
    pub(crate) fn fitted_model() -> FittedModel {
        let mut x: Vec<FeatureVector> = Vec::new();
        let mut y = Vec::new();
        for i in 0..60 {
            let humidity = 30.0 + i as f64;
            x.push([
                1.0 + (i % 28) as f64,
                1.0 + (i % 12) as f64,
                (i % 24) as f64,
                humidity,
                1000.0 + (i % 25) as f64,
                (i % 15) as f64,
            ]);
            y.push(if humidity < 60.0 { 12.0 } else { 28.0 });
        }
        let scaler = StandardScaler::fit(&x).unwrap();
        let regressor = RandomForestRegressor::fit(
            &scaler.transform_all(&x),
            &y,
            ForestParams {
                n_estimators: 15,
                ..ForestParams::default()
            },
        )
        .unwrap();
        FittedModel { scaler, regressor }
    }
}
