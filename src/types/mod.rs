pub mod sample;
pub mod coefficients;
pub mod results;

pub use sample::CalibrationSample;
pub use coefficients::CoefficientRow;
pub use results::{AxisMetrics, CalibrationReport};
