use super::basis::TERM_COUNT;
use super::regression::PolynomialFit;
use crate::types::CoefficientRow;

/// Maps raw line-sensor readings to screen coordinates using a stored
/// coefficient row.
#[derive(Debug, Clone)]
pub struct ScreenPositionEstimator {
    fit: PolynomialFit,
    time_created: String,
}

impl ScreenPositionEstimator {
    pub fn from_row(row: &CoefficientRow) -> Self {
        Self {
            fit: PolynomialFit { x: row.x, y: row.y },
            time_created: row.time_created.clone(),
        }
    }

    pub fn time_created(&self) -> &str {
        &self.time_created
    }

    pub fn coefficients(&self) -> (&[f64; TERM_COUNT], &[f64; TERM_COUNT]) {
        (&self.fit.x, &self.fit.y)
    }

    /// Estimated (x, y) for readings `l45`, `l90`.
    pub fn estimate(&self, l45: f64, l90: f64) -> (f64, f64) {
        self.fit.predict(l45, l90)
    }

    /// Same as [`estimate`](Self::estimate), rounded to whole pixels and
    /// clamped at zero.
    pub fn estimate_pixel(&self, l45: f64, l90: f64) -> (u32, u32) {
        let (x, y) = self.estimate(l45, l90);
        let to_px = |v: f64| v.round().clamp(0.0, u32::MAX as f64) as u32;
        (to_px(x), to_px(y))
    }
}
