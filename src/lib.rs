pub mod calibration;
pub mod config;
pub mod database;
pub mod error;
pub mod fitting;
pub mod logger;
pub mod types;

pub use calibration::{calibrate, run_calibration};
pub use config::{AppConfig, ConfigError};
pub use database::CalibrationStore;
pub use error::{FitError, FitResult};
