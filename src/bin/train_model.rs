//! Offline trainer for the temperature model.
//!
//! Reads (or synthesizes) historical weather records, fits the scaler and the
//! random forest, prints held-out metrics and writes the two artifacts the API
//! server loads at startup. Any failure exits non-zero.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weather_ml_api::config::{DEFAULT_MODEL_PATH, DEFAULT_SCALER_PATH};
use weather_ml_api::model::features::{FEATURE_NAMES, TIMESTAMP_FORMAT};
use weather_ml_api::services::trainer::{self, TrainerParams, TrainingError};

/// Train the temperature regression model.
#[derive(Debug, Parser)]
#[command(name = "train-model", version, about)]
struct Cli {
    /// CSV dataset with a `datetime` (or `date` + `time`) column plus
    /// humidity, pressure, wind_speed and temp. Created with sample data if absent.
    #[arg(long, default_value = "./historical_weather.csv")]
    dataset: PathBuf,

    /// Where to write the fitted regressor
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    model_out: PathBuf,

    /// Where to write the fitted scaler
    #[arg(long, default_value = DEFAULT_SCALER_PATH)]
    scaler_out: PathBuf,

    /// Number of trees in the forest
    #[arg(long, default_value_t = 100)]
    trees: usize,

    /// Seed for the train/test split and the bootstrap samples
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn run(cli: &Cli) -> Result<(), TrainingError> {
    println!("=== Weather Model Training ===");

    let records = trainer::load_or_synthesize(&cli.dataset)?;

    println!("\nSample data:");
    println!("{:<20} {:>6}", "datetime", "temp");
    for r in records.iter().take(5) {
        println!("{:<20} {:>6.1}", r.datetime.format(TIMESTAMP_FORMAT), r.temp);
    }

    let params = TrainerParams {
        n_estimators: cli.trees,
        seed: cli.seed,
        ..TrainerParams::default()
    };
    let outcome = trainer::train(&records, &params)?;

    println!("\nModel Performance:");
    println!("- MAE: {:.2}°C", outcome.metrics.mae);
    println!("- R²: {:.2}", outcome.metrics.r2);
    println!(
        "- train/test: {}/{}",
        outcome.metrics.train_size, outcome.metrics.test_size
    );

    trainer::persist(&outcome.model, &cli.model_out, &cli.scaler_out)?;

    println!("\nSaved model artifacts:");
    println!(" - {}", cli.model_out.display());
    println!(" - {}", cli.scaler_out.display());
    println!("Features used: {:?}", FEATURE_NAMES);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_ml_api=info,train_model=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Training failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
