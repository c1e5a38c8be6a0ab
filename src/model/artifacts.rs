//! Binary persistence of the fitted scaler and regressor.
//!
//! The two halves of a `FittedModel` are written to independent files so the
//! server can address each by a fixed location.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use super::forest::RandomForestRegressor;
use super::{FittedModel, ModelError};

const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

fn write_artifact<T: Serialize>(value: &T, path: &Path) -> Result<usize, ModelError> {
    let bytes = bincode::serde::encode_to_vec(value, BINCODE_CONFIG)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| ModelError::ArtifactWrite(path.to_path_buf(), e))?;
    }
    std::fs::write(path, &bytes).map_err(|e| ModelError::ArtifactWrite(path.to_path_buf(), e))?;
    Ok(bytes.len())
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let bytes = std::fs::read(path).map_err(|e| ModelError::ArtifactRead(path.to_path_buf(), e))?;
    let (value, _) = bincode::serde::decode_from_slice::<T, _>(&bytes, BINCODE_CONFIG)
        .map_err(|e| ModelError::ArtifactDecode(path.to_path_buf(), e))?;
    Ok(value)
}

/// Write the regressor to `model_path` and the scaler to `scaler_path`.
pub fn save(model: &FittedModel, model_path: &Path, scaler_path: &Path) -> Result<(), ModelError> {
    let model_bytes = write_artifact(&model.regressor, model_path)?;
    let scaler_bytes = write_artifact(&model.scaler, scaler_path)?;
    tracing::debug!(
        "Wrote {} ({} bytes) and {} ({} bytes)",
        model_path.display(),
        model_bytes,
        scaler_path.display(),
        scaler_bytes
    );
    Ok(())
}

/// Load both artifacts. Either one missing, corrupt or structurally invalid
/// fails the whole load.
pub fn load(model_path: &Path, scaler_path: &Path) -> Result<FittedModel, ModelError> {
    let regressor: RandomForestRegressor = read_artifact(model_path)?;
    regressor.validate()?;
    Ok(FittedModel {
        regressor,
        scaler: read_artifact(scaler_path)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::features::FeatureVector;
    use crate::model::forest::{ForestParams, RandomForestRegressor};
    use crate::model::scaler::StandardScaler;

    fn small_model() -> FittedModel {
        let x: Vec<FeatureVector> = (0..20)
            .map(|i| [1.0 + i as f64, 6.0, 12.0, 40.0 + i as f64, 1010.0, 2.0])
            .collect();
        let y: Vec<f64> = (0..20).map(|i| 20.0 + i as f64 * 0.5).collect();
        let scaler = StandardScaler::fit(&x).unwrap();
        let regressor = RandomForestRegressor::fit(
            &scaler.transform_all(&x),
            &y,
            ForestParams {
                n_estimators: 3,
                ..ForestParams::default()
            },
        )
        .unwrap();
        FittedModel { scaler, regressor }
    }

    #[test]
    fn test_save_then_load_restores_model() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("artifacts/model.bin");
        let scaler_path = dir.path().join("artifacts/scaler.bin");
        let model = small_model();

        save(&model, &model_path, &scaler_path).unwrap();
        let loaded = load(&model_path, &scaler_path).unwrap();

        assert_eq!(loaded, model);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load(&dir.path().join("model.bin"), &dir.path().join("scaler.bin"));
        assert!(matches!(result, Err(ModelError::ArtifactRead(..))));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.bin");
        let scaler_path = dir.path().join("scaler.bin");
        save(&small_model(), &model_path, &scaler_path).unwrap();
        std::fs::write(&model_path, b"\xff\xff").unwrap();

        let result = load(&model_path, &scaler_path);
        assert!(matches!(result, Err(ModelError::ArtifactDecode(..))));
    }
}
