use std::path::PathBuf;

use crate::config::ConfigError;

/// Errors raised while fitting and persisting calibration coefficients
#[derive(Debug, thiserror::Error)]
pub enum FitError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Database file not found: {}", .0.display())]
    MissingDatabase(PathBuf),
    #[error("No training data found")]
    NoTrainingData,
    #[error("Batch {batch} has {found} samples, at least {required} required")]
    TooFewSamples {
        batch: String,
        found: usize,
        required: usize,
    },
    #[error("Malformed sample: {0}")]
    MalformedSample(String),
    #[error("Numerical error: {0}")]
    Numerical(String),
}

pub type FitResult<T> = Result<T, FitError>;
