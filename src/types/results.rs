/// Residual statistics of one fitted axis over the training batch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisMetrics {
    pub rms_error: f64,
    pub max_error: f64,
}

impl AxisMetrics {
    pub fn from_residuals(residuals: impl IntoIterator<Item = f64>) -> Self {
        let mut count = 0usize;
        let mut sq_sum = 0.0;
        let mut max_error = 0.0f64;

        for r in residuals {
            count += 1;
            sq_sum += r * r;
            max_error = max_error.max(r.abs());
        }

        if count == 0 {
            return Self::default();
        }

        Self {
            rms_error: (sq_sum / count as f64).sqrt(),
            max_error,
        }
    }
}

/// Result of one calibration run
#[derive(Debug, Clone)]
pub struct CalibrationReport {
    pub batch_time: String,
    pub time_created: String,
    pub sample_count: usize,
    pub x_metrics: AxisMetrics,
    pub y_metrics: AxisMetrics,
}

impl CalibrationReport {
    /// The two lines printed on stdout after a successful run.
    pub fn summary_lines(&self) -> [String; 2] {
        [
            format!(
                "Coefficients have been generated for the training data collected: {}",
                self.batch_time
            ),
            format!("Row in coefficients timeCreated column: {}", self.time_created),
        ]
    }
}
