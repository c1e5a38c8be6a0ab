pub mod aggregator;
pub mod openweather;
pub mod predictor;
pub mod trainer;
