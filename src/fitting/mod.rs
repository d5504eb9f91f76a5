pub mod basis;
pub mod estimator;
pub mod regression;

pub use basis::{expand, Monomial, TERMS, TERM_COUNT};
pub use estimator::ScreenPositionEstimator;
pub use regression::{fit, PolynomialFit};
