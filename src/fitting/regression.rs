use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

use super::basis::{self, TERMS, TERM_COUNT};
use crate::error::{FitError, FitResult};
use crate::types::{AxisMetrics, CalibrationSample};

/// Coefficients of both screen axes, in basis order.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialFit {
    pub x: [f64; TERM_COUNT],
    pub y: [f64; TERM_COUNT],
}

impl PolynomialFit {
    pub fn predict(&self, l45: f64, l90: f64) -> (f64, f64) {
        let features = basis::expand(l45, l90);
        let dot = |c: &[f64; TERM_COUNT]| -> f64 {
            c.iter().zip(features.iter()).map(|(a, b)| a * b).sum()
        };
        (dot(&self.x), dot(&self.y))
    }

    /// Residual statistics of each axis over `samples`.
    pub fn metrics(&self, samples: &[CalibrationSample]) -> (AxisMetrics, AxisMetrics) {
        let predicted: Vec<(f64, f64)> =
            samples.iter().map(|s| self.predict(s.l45, s.l90)).collect();
        let x = AxisMetrics::from_residuals(samples.iter().zip(&predicted).map(|(s, p)| p.0 - s.x));
        let y = AxisMetrics::from_residuals(samples.iter().zip(&predicted).map(|(s, p)| p.1 - s.y));
        (x, y)
    }
}

/// Fit x and y against the degree-4 expansion of (L45, L90) by ordinary
/// least squares. The constant term of the basis acts as the intercept.
///
/// Readings are divided by their largest magnitude before expansion and the
/// coefficients are mapped back afterwards, so pixel-scale readings do not
/// push the design matrix towards singularity.
pub fn fit(samples: &[CalibrationSample]) -> FitResult<PolynomialFit> {
    if samples.is_empty() {
        return Err(FitError::NoTrainingData);
    }

    if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
        return Err(FitError::MalformedSample(format!(
            "sample {} contains a non-finite value",
            pos
        )));
    }

    if samples.len() < TERM_COUNT {
        warn!(
            "Only {} samples for {} terms, using the minimum-norm solution",
            samples.len(),
            TERM_COUNT
        );
    }

    let scale_l45 = reading_scale(samples.iter().map(|s| s.l45));
    let scale_l90 = reading_scale(samples.iter().map(|s| s.l90));
    let scaled: Vec<CalibrationSample> = samples
        .iter()
        .map(|s| CalibrationSample::new(s.x, s.y, s.l45 / scale_l45, s.l90 / scale_l90))
        .collect();
    debug!("Reading scales: L45 {}, L90 {}", scale_l45, scale_l90);

    let design = basis::design_matrix(&scaled);
    let targets_x = DVector::from_iterator(samples.len(), samples.iter().map(|s| s.x));
    let targets_y = DVector::from_iterator(samples.len(), samples.iter().map(|s| s.y));

    let solved = solve_least_squares(&design, &[targets_x, targets_y])?;
    debug!("Fitted {} samples against {} terms", samples.len(), TERM_COUNT);

    let mut x = to_array(&solved[0])?;
    let mut y = to_array(&solved[1])?;
    for (i, term) in TERMS.iter().enumerate() {
        let factor = term.eval(scale_l45, scale_l90);
        x[i] /= factor;
        y[i] /= factor;
    }

    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(FitError::Numerical("rescaled coefficients are not finite".to_string()));
    }

    Ok(PolynomialFit { x, y })
}

/// Largest absolute reading, or 1 when every reading is zero.
fn reading_scale(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.fold(0.0f64, |acc, v| acc.max(v.abs()));
    if max.is_normal() {
        max
    } else {
        1.0
    }
}

/// Minimum-norm least-squares solutions of `design * beta = target` for each
/// target, sharing one SVD. Singular values below
/// `max(rows, cols) * eps * sigma_max` are treated as zero.
pub fn solve_least_squares(
    design: &DMatrix<f64>,
    targets: &[DVector<f64>],
) -> FitResult<Vec<DVector<f64>>> {
    let (rows, cols) = design.shape();
    let svd = design.clone().svd(true, true);

    let sigma_max = svd.singular_values.iter().cloned().fold(0.0f64, f64::max);
    if !sigma_max.is_finite() {
        return Err(FitError::Numerical(
            "design matrix has non-finite singular values".to_string(),
        ));
    }
    let tolerance = rows.max(cols) as f64 * f64::EPSILON * sigma_max;

    let rank = svd.singular_values.iter().filter(|s| **s > tolerance).count();
    if rank < cols {
        debug!("Design matrix rank {} < {} columns", rank, cols);
    }

    targets
        .iter()
        .map(|target| {
            let beta = svd
                .solve(target, tolerance)
                .map_err(|e| FitError::Numerical(e.to_string()))?;
            if beta.iter().all(|v| v.is_finite()) {
                Ok(beta)
            } else {
                Err(FitError::Numerical("least-squares solution is not finite".to_string()))
            }
        })
        .collect()
}

fn to_array(v: &DVector<f64>) -> FitResult<[f64; TERM_COUNT]> {
    if v.len() != TERM_COUNT {
        return Err(FitError::Numerical(format!(
            "expected {} coefficients, got {}",
            TERM_COUNT,
            v.len()
        )));
    }
    let mut out = [0.0; TERM_COUNT];
    out.copy_from_slice(v.as_slice());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_samples(f: impl Fn(f64, f64) -> (f64, f64)) -> Vec<CalibrationSample> {
        let mut samples = Vec::new();
        for i in 0..6 {
            for j in 0..6 {
                let a = -1.0 + 0.4 * i as f64;
                let b = -1.0 + 0.4 * j as f64;
                let (x, y) = f(a, b);
                samples.push(CalibrationSample::new(x, y, a, b));
            }
        }
        samples
    }

    #[test]
    fn recovers_full_fourth_order_polynomial() {
        let truth_x: [f64; TERM_COUNT] = [
            3.0, 1.0, -2.0, 0.5, 0.25, -0.75, 0.1, 0.2, -0.3, 0.4, 0.05, -0.06, 0.07, -0.08, 0.09,
        ];
        let truth_y: [f64; TERM_COUNT] = std::array::from_fn(|i| (i as f64 - 7.0) * 0.1);
        let truth = PolynomialFit { x: truth_x, y: truth_y };

        let samples = grid_samples(|a, b| truth.predict(a, b));
        let fitted = fit(&samples).unwrap();

        for i in 0..TERM_COUNT {
            assert!((fitted.x[i] - truth_x[i]).abs() < 1e-8, "x[{}] = {}", i, fitted.x[i]);
            assert!((fitted.y[i] - truth_y[i]).abs() < 1e-8, "y[{}] = {}", i, fitted.y[i]);
        }

        let (mx, my) = fitted.metrics(&samples);
        assert!(mx.max_error < 1e-9);
        assert!(my.max_error < 1e-9);
    }

    #[test]
    fn rank_deficient_identity_batch_is_reproduced() {
        // L45 == L90 on every sample, so the expansion has rank 5.
        let samples: Vec<CalibrationSample> = (0..20)
            .map(|i| {
                let a = i as f64 * 0.1;
                CalibrationSample::new(a, a, a, a)
            })
            .collect();

        let fitted = fit(&samples).unwrap();
        for s in &samples {
            let (px, py) = fitted.predict(s.l45, s.l90);
            assert!((px - s.x).abs() < 1e-8);
            assert!((py - s.y).abs() < 1e-8);
        }
    }

    #[test]
    fn pixel_scale_readings_are_fitted_exactly() {
        let truth = PolynomialFit {
            x: [
                12.0, 0.8, -0.3, 1e-3, -2e-4, 5e-4, 2e-7, -1e-7, 3e-7, -4e-7, 1e-10, -2e-10,
                3e-10, -1e-10, 2e-10,
            ],
            y: [
                -40.0, -0.2, 1.1, -3e-4, 6e-4, 1e-4, -1e-7, 2e-7, 1e-7, -3e-7, -2e-10, 1e-10,
                -1e-10, 4e-10, 1e-10,
            ],
        };
        let mut samples = Vec::new();
        for i in 0..8 {
            for j in 0..8 {
                let a = 100.0 + 900.0 * i as f64 / 7.0;
                let b = 100.0 + 900.0 * j as f64 / 7.0;
                let (x, y) = truth.predict(a, b);
                samples.push(CalibrationSample::new(x, y, a, b));
            }
        }

        let fitted = fit(&samples).unwrap();
        let (mx, my) = fitted.metrics(&samples);
        assert!(mx.max_error < 1e-6, "x max residual {}", mx.max_error);
        assert!(my.max_error < 1e-6, "y max residual {}", my.max_error);
    }

    #[test]
    fn zero_readings_do_not_break_scaling() {
        let samples: Vec<CalibrationSample> =
            (0..5).map(|i| CalibrationSample::new(i as f64, 7.0, i as f64, 0.0)).collect();
        let fitted = fit(&samples).unwrap();
        let (mx, my) = fitted.metrics(&samples);
        assert!(mx.max_error < 1e-9);
        assert!(my.max_error < 1e-9);
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(fit(&[]), Err(FitError::NoTrainingData)));
    }

    #[test]
    fn non_finite_sample_is_rejected() {
        let samples = vec![
            CalibrationSample::new(1.0, 1.0, 0.5, 0.5),
            CalibrationSample::new(1.0, f64::NAN, 0.5, 0.5),
        ];
        assert!(matches!(fit(&samples), Err(FitError::MalformedSample(_))));
    }

    #[test]
    fn underdetermined_batch_still_fits_its_points() {
        let samples = vec![
            CalibrationSample::new(10.0, 20.0, 0.1, 0.2),
            CalibrationSample::new(30.0, 40.0, 0.3, 0.1),
            CalibrationSample::new(50.0, 60.0, 0.5, 0.9),
        ];
        let fitted = fit(&samples).unwrap();
        let (mx, my) = fitted.metrics(&samples);
        assert!(mx.max_error < 1e-6);
        assert!(my.max_error < 1e-6);
    }
}
