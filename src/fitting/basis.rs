use nalgebra::DMatrix;

use crate::types::CalibrationSample;

/// Highest total degree of the calibration polynomial.
pub const DEGREE: u32 = 4;

/// Number of monomials of total degree <= 4 in two variables.
pub const TERM_COUNT: usize = 15;

/// One monomial `L45^l45 * L90^l90` of the calibration polynomial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Monomial {
    pub l45: u32,
    pub l90: u32,
}

impl Monomial {
    const fn new(l45: u32, l90: u32) -> Self {
        Self { l45, l90 }
    }

    pub fn degree(&self) -> u32 {
        self.l45 + self.l90
    }

    pub fn eval(&self, l45: f64, l90: f64) -> f64 {
        l45.powi(self.l45 as i32) * l90.powi(self.l90 as i32)
    }

    /// Column suffix used by the coefficient table, e.g. `L45_2_L90`.
    pub fn name(&self) -> String {
        fn factor(var: &str, pow: u32) -> Option<String> {
            match pow {
                0 => None,
                1 => Some(var.to_string()),
                n => Some(format!("{}_{}", var, n)),
            }
        }

        let parts: Vec<String> = [factor("L45", self.l45), factor("L90", self.l90)]
            .into_iter()
            .flatten()
            .collect();

        if parts.is_empty() {
            "1".to_string()
        } else {
            parts.join("_")
        }
    }
}

/// Graded lexicographic order, L45 leading. Feature vectors, coefficient
/// vectors and the coefficient table columns all follow this order.
pub const TERMS: [Monomial; TERM_COUNT] = [
    Monomial::new(0, 0),
    Monomial::new(1, 0),
    Monomial::new(0, 1),
    Monomial::new(2, 0),
    Monomial::new(1, 1),
    Monomial::new(0, 2),
    Monomial::new(3, 0),
    Monomial::new(2, 1),
    Monomial::new(1, 2),
    Monomial::new(0, 3),
    Monomial::new(4, 0),
    Monomial::new(3, 1),
    Monomial::new(2, 2),
    Monomial::new(1, 3),
    Monomial::new(0, 4),
];

/// Expand one pair of sensor readings into its 15 monomial features.
pub fn expand(l45: f64, l90: f64) -> [f64; TERM_COUNT] {
    let mut features = [0.0; TERM_COUNT];
    for (slot, term) in features.iter_mut().zip(TERMS.iter()) {
        *slot = term.eval(l45, l90);
    }
    features
}

/// N x 15 design matrix, one row per sample.
pub fn design_matrix(samples: &[CalibrationSample]) -> DMatrix<f64> {
    DMatrix::from_fn(samples.len(), TERM_COUNT, |row, col| {
        TERMS[col].eval(samples[row].l45, samples[row].l90)
    })
}

/// Coefficient column names for one axis prefix (`x` or `y`), in basis order.
pub fn column_names(prefix: &str) -> Vec<String> {
    TERMS
        .iter()
        .map(|term| format!("{}_{}", prefix, term.name()))
        .collect()
}
