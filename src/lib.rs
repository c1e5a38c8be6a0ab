//! Weather ML Forecast API.
//!
//! Serves current conditions and a five-day forecast from OpenWeatherMap,
//! each record augmented with a temperature estimate from a random-forest
//! model trained offline by the `train-model` binary.

pub mod config;
pub mod errors;
pub mod helpers;
pub mod model;
pub mod routes;
pub mod services;
