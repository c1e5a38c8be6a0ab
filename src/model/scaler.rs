//! Per-feature standardization (zero mean, unit variance).

use serde::{Deserialize, Serialize};

use super::features::{FeatureVector, N_FEATURES};
use super::ModelError;

/// Fitted standard scaler.
///
/// Uses the population standard deviation. A feature with zero variance keeps
/// a scale of 1 so it transforms to 0 instead of NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: FeatureVector,
    scale: FeatureVector,
}

impl StandardScaler {
    /// Compute per-feature mean and standard deviation.
    pub fn fit(samples: &[FeatureVector]) -> Result<Self, ModelError> {
        if samples.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        let n = samples.len() as f64;

        let mut mean = [0.0; N_FEATURES];
        for sample in samples {
            for (m, x) in mean.iter_mut().zip(sample) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut scale = [0.0; N_FEATURES];
        for sample in samples {
            for i in 0..N_FEATURES {
                let d = sample[i] - mean[i];
                scale[i] += d * d;
            }
        }
        for s in &mut scale {
            *s = (*s / n).sqrt();
            if *s == 0.0 || !s.is_finite() {
                *s = 1.0;
            }
        }

        Ok(Self { mean, scale })
    }

    pub fn transform(&self, sample: &FeatureVector) -> FeatureVector {
        let mut out = [0.0; N_FEATURES];
        for i in 0..N_FEATURES {
            out[i] = (sample[i] - self.mean[i]) / self.scale[i];
        }
        out
    }

    pub fn transform_all(&self, samples: &[FeatureVector]) -> Vec<FeatureVector> {
        samples.iter().map(|s| self.transform(s)).collect()
    }

    pub fn mean(&self) -> &FeatureVector {
        &self.mean
    }

    pub fn scale(&self) -> &FeatureVector {
        &self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<FeatureVector> {
        vec![
            [1.0, 1.0, 12.0, 60.0, 1010.0, 2.0],
            [2.0, 1.0, 12.0, 70.0, 1012.0, 3.0],
            [3.0, 1.0, 12.0, 80.0, 1014.0, 4.0],
        ]
    }

    #[test]
    fn test_fit_mean() {
        let scaler = StandardScaler::fit(&samples()).unwrap();
        assert_eq!(scaler.mean(), &[2.0, 1.0, 12.0, 70.0, 1012.0, 3.0]);
    }

    #[test]
    fn test_transformed_columns_are_standardized() {
        let data = samples();
        let scaler = StandardScaler::fit(&data).unwrap();
        let scaled = scaler.transform_all(&data);
        for col in [0, 3, 4, 5] {
            let mean: f64 = scaled.iter().map(|s| s[col]).sum::<f64>() / 3.0;
            let var: f64 = scaled.iter().map(|s| (s[col] - mean).powi(2)).sum::<f64>() / 3.0;
            assert!(mean.abs() < 1e-9, "column {} mean {}", col, mean);
            assert!((var - 1.0).abs() < 1e-9, "column {} variance {}", col, var);
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let data = samples();
        let scaler = StandardScaler::fit(&data).unwrap();
        assert_eq!(scaler.scale()[1], 1.0);
        let scaled = scaler.transform(&data[0]);
        assert_eq!(scaled[1], 0.0);
        assert_eq!(scaled[2], 0.0);
    }

    #[test]
    fn test_fit_empty() {
        assert!(matches!(
            StandardScaler::fit(&[]),
            Err(ModelError::EmptyTrainingSet)
        ));
    }
}
