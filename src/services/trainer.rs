//! Offline model training.
//!
//! Loads a historical dataset (or synthesizes a placeholder one), derives the
//! calendar features, fits a scaler and a random forest on an 80/20 split,
//! evaluates on the held-out part and persists the two artifacts.
//!
//! Every error here is terminal for the training run.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

use crate::helpers::round_1dp;
use crate::model::features::{feature_vector, FeatureVector, FEATURE_NAMES, TIMESTAMP_FORMAT};
use crate::model::forest::{ForestParams, RandomForestRegressor};
use crate::model::scaler::StandardScaler;
use crate::model::{artifacts, FittedModel, ModelError};

/// Target column.
pub const TARGET: &str = "temp";

/// Number of records in the synthesized placeholder dataset.
pub const SAMPLE_RECORDS: usize = 500;

/// Columns read from the dataset besides the datetime.
const NUMERIC_COLUMNS: [&str; 3] = ["humidity", "pressure", "wind_speed"];

/// Datetime formats accepted in the dataset, tried in order.
const DATETIME_FORMATS: [&str; 4] = [
    TIMESTAMP_FORMAT,
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("Failed to read dataset {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing datetime or date/time columns")]
    MissingDatetime,

    #[error("Missing required features: {0:?}")]
    MissingFeatures(Vec<String>),

    #[error("Missing target column: {0}")]
    MissingTarget(String),

    #[error("Row {row}: invalid {column} value '{value}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Dataset is too small to split: {0} records")]
    TooFewRecords(usize),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

/// One historical sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRecord {
    pub datetime: NaiveDateTime,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub temp: f64,
}

impl TrainingRecord {
    pub fn features(&self) -> FeatureVector {
        feature_vector(&self.datetime, self.humidity, self.pressure, self.wind_speed)
    }
}

/// Training hyperparameters.
#[derive(Debug, Clone, Copy)]
pub struct TrainerParams {
    pub test_fraction: f64,
    pub seed: u64,
    pub n_estimators: usize,
}

impl Default for TrainerParams {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            n_estimators: 100,
        }
    }
}

/// Held-out evaluation of a fitted model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub mae: f64,
    pub r2: f64,
    pub train_size: usize,
    pub test_size: usize,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: FittedModel,
    pub metrics: Metrics,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load the dataset at `path`, or synthesize (and write) a placeholder one if
/// the file does not exist.
pub fn load_or_synthesize(path: &Path) -> Result<Vec<TrainingRecord>, TrainingError> {
    if !path.exists() {
        tracing::warn!(
            "No dataset at {} - generating {} sample records",
            path.display(),
            SAMPLE_RECORDS
        );
        let records = synthesize(SAMPLE_RECORDS, 42);
        write_dataset(path, &records)?;
        return Ok(records);
    }

    let file = std::fs::File::open(path).map_err(|e| TrainingError::Io(path.to_path_buf(), e))?;
    let records = read_dataset(file)?;
    tracing::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Deterministic placeholder data: one record per day at 12:00 starting
/// 2025-01-01. It has no predictive value; it keeps the pipeline runnable.
pub fn synthesize(n: usize, seed: u64) -> Vec<TrainingRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap_or_default()
        .and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default());

    (0..n)
        .map(|i| TrainingRecord {
            datetime: start + Duration::days(i as i64),
            humidity: round_1dp(rng.random_range(40.0..90.0)),
            pressure: round_1dp(rng.random_range(1000.0..1025.0)),
            wind_speed: round_1dp(rng.random_range(0.0..15.0)),
            temp: round_1dp(rng.random_range(25.0..30.0)),
        })
        .collect()
}

fn write_dataset(path: &Path, records: &[TrainingRecord]) -> Result<(), TrainingError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["datetime", "humidity", "pressure", "wind_speed", TARGET])?;
    for r in records {
        writer.write_record([
            r.datetime.format(TIMESTAMP_FORMAT).to_string(),
            r.humidity.to_string(),
            r.pressure.to_string(),
            r.wind_speed.to_string(),
            r.temp.to_string(),
        ])?;
    }
    writer
        .flush()
        .map_err(|e| TrainingError::Io(path.to_path_buf(), e))?;
    tracing::info!("Wrote sample dataset to {}", path.display());
    Ok(())
}

/// Where the datetime of a row comes from.
#[derive(Clone, Copy)]
enum DatetimeSource {
    Single(usize),
    DateAndTime(usize, usize),
}

/// Parse and validate a CSV dataset.
///
/// Validation runs before any row is parsed: datetime column(s) first, then
/// the feature columns, then the target.
pub fn read_dataset<R: std::io::Read>(reader: R) -> Result<Vec<TrainingRecord>, TrainingError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let datetime = match (column("datetime"), column("date"), column("time")) {
        (Some(dt), _, _) => DatetimeSource::Single(dt),
        (None, Some(d), Some(t)) => DatetimeSource::DateAndTime(d, t),
        _ => return Err(TrainingError::MissingDatetime),
    };

    let missing: Vec<String> = NUMERIC_COLUMNS
        .iter()
        .filter(|&&c| column(c).is_none())
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(TrainingError::MissingFeatures(missing));
    }
    let target = column(TARGET).ok_or_else(|| TrainingError::MissingTarget(TARGET.to_string()))?;
    let [humidity, pressure, wind_speed] = NUMERIC_COLUMNS.map(|c| column(c).unwrap_or_default());

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        let line = i + 2;
        let field = |idx: usize| row.get(idx).unwrap_or("");

        let raw_datetime = match datetime {
            DatetimeSource::Single(idx) => field(idx).to_string(),
            DatetimeSource::DateAndTime(d, t) => format!("{} {}", field(d), field(t)),
        };
        let number = |idx: usize, name: &str| -> Result<f64, TrainingError> {
            field(idx)
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| TrainingError::InvalidValue {
                    row: line,
                    column: name.to_string(),
                    value: field(idx).to_string(),
                })
        };

        records.push(TrainingRecord {
            datetime: parse_datetime(&raw_datetime).ok_or_else(|| TrainingError::InvalidValue {
                row: line,
                column: "datetime".to_string(),
                value: raw_datetime.clone(),
            })?,
            humidity: number(humidity, "humidity")?,
            pressure: number(pressure, "pressure")?,
            wind_speed: number(wind_speed, "wind_speed")?,
            temp: number(target, TARGET)?,
        });
    }

    Ok(records)
}

/// Parse a dataset datetime; a bare date means midnight.
fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ---------------------------------------------------------------------------
// Fitting
// ---------------------------------------------------------------------------

/// Shuffle indices with a fixed seed and split off `ceil(n * test_fraction)`
/// of them for testing. Returns `(train, test)`.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let test_size = ((n as f64) * test_fraction).ceil() as usize;
    let test = indices.split_off(n - test_size.min(n));
    (indices, test)
}

pub fn mean_absolute_error(truth: &[f64], predicted: &[f64]) -> f64 {
    let total: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).abs())
        .sum();
    total / truth.len() as f64
}

/// Coefficient of determination. A constant truth scores 1.0 when predicted
/// exactly and 0.0 otherwise.
pub fn r2_score(truth: &[f64], predicted: &[f64]) -> f64 {
    let mean = truth.iter().sum::<f64>() / truth.len() as f64;
    let ss_res: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = truth.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Fit scaler and forest on the training split and evaluate on the test split.
pub fn train(
    records: &[TrainingRecord],
    params: &TrainerParams,
) -> Result<TrainingOutcome, TrainingError> {
    let (train_idx, test_idx) = train_test_split(records.len(), params.test_fraction, params.seed);
    if train_idx.is_empty() || test_idx.is_empty() {
        return Err(TrainingError::TooFewRecords(records.len()));
    }

    let gather = |idx: &[usize]| -> (Vec<FeatureVector>, Vec<f64>) {
        idx.iter()
            .map(|&i| (records[i].features(), records[i].temp))
            .unzip()
    };
    let (x_train, y_train) = gather(&train_idx);
    let (x_test, y_test) = gather(&test_idx);

    let scaler = StandardScaler::fit(&x_train)?;
    let regressor = RandomForestRegressor::fit(
        &scaler.transform_all(&x_train),
        &y_train,
        ForestParams {
            n_estimators: params.n_estimators,
            seed: params.seed,
            ..ForestParams::default()
        },
    )?;
    tracing::info!(
        "Fitted {} trees on {} records using features {:?}",
        regressor.n_estimators(),
        x_train.len(),
        FEATURE_NAMES
    );

    let y_pred = regressor.predict_all(&scaler.transform_all(&x_test))?;
    let metrics = Metrics {
        mae: mean_absolute_error(&y_test, &y_pred),
        r2: r2_score(&y_test, &y_pred),
        train_size: x_train.len(),
        test_size: x_test.len(),
    };

    Ok(TrainingOutcome {
        model: FittedModel { scaler, regressor },
        metrics,
    })
}

/// Persist the fitted regressor and scaler as two independent artifacts.
pub fn persist(
    model: &FittedModel,
    model_path: &Path,
    scaler_path: &Path,
) -> Result<(), TrainingError> {
    artifacts::save(model, model_path, scaler_path)?;
    Ok(())
}
