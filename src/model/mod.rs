//! Temperature regression model: feature layout, scaler, forest, artifacts.

pub mod artifacts;
pub mod features;
pub mod forest;
pub mod scaler;

use std::path::PathBuf;

use features::FeatureVector;
use forest::RandomForestRegressor;
use scaler::StandardScaler;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("Sample/target length mismatch: {samples} samples, {targets} targets")]
    LengthMismatch { samples: usize, targets: usize },

    #[error("Forest has no trees")]
    EmptyForest,

    #[error("Malformed regression tree at node {0}")]
    InvalidTree(usize),

    #[error("Non-finite prediction: {0}")]
    NonFinitePrediction(f64),

    #[error("Failed to read artifact {0}: {1}")]
    ArtifactRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write artifact {0}: {1}")]
    ArtifactWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode artifact {0}: {1}")]
    ArtifactDecode(PathBuf, #[source] bincode::error::DecodeError),

    #[error("Failed to encode artifact: {0}")]
    ArtifactEncode(#[from] bincode::error::EncodeError),
}

/// A fitted scaler + regressor pair.
///
/// Immutable once built; the server holds exactly one for its lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    pub scaler: StandardScaler,
    pub regressor: RandomForestRegressor,
}

impl FittedModel {
    /// Scale a raw feature vector and run it through the forest.
    pub fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let scaled = self.scaler.transform(features);
        let prediction = self.regressor.predict(&scaled)?;
        if !prediction.is_finite() {
            return Err(ModelError::NonFinitePrediction(prediction));
        }
        Ok(prediction)
    }
}
