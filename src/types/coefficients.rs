use crate::fitting::basis::TERM_COUNT;

/// Total number of coefficient columns (x fit followed by y fit).
pub const COEFFICIENT_COUNT: usize = 2 * TERM_COUNT;

/// One row of the coefficient table. Both vectors are in basis order.
#[derive(Clone, Debug, PartialEq)]
pub struct CoefficientRow {
    pub x: [f64; TERM_COUNT],
    pub y: [f64; TERM_COUNT],
    pub time_created: String,
}

impl CoefficientRow {
    pub fn new(
        x: [f64; TERM_COUNT],
        y: [f64; TERM_COUNT],
        time_created: impl Into<String>,
    ) -> Self {
        Self {
            x,
            y,
            time_created: time_created.into(),
        }
    }

    /// Insertion order: the 15 x coefficients, then the 15 y coefficients.
    pub fn flattened(&self) -> [f64; COEFFICIENT_COUNT] {
        let mut out = [0.0; COEFFICIENT_COUNT];
        out[..TERM_COUNT].copy_from_slice(&self.x);
        out[TERM_COUNT..].copy_from_slice(&self.y);
        out
    }

    /// Inverse of [`CoefficientRow::flattened`].
    pub fn from_flat(values: &[f64; COEFFICIENT_COUNT], time_created: impl Into<String>) -> Self {
        let mut x = [0.0; TERM_COUNT];
        let mut y = [0.0; TERM_COUNT];
        x.copy_from_slice(&values[..TERM_COUNT]);
        y.copy_from_slice(&values[TERM_COUNT..]);
        Self::new(x, y, time_created)
    }
}
