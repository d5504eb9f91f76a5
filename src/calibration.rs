use log::info;

use crate::config::{AppConfig, FitConfig};
use crate::database::CalibrationStore;
use crate::error::{FitError, FitResult};
use crate::fitting::regression;
use crate::types::{CalibrationReport, CoefficientRow};

/// Fit the newest training batch in the configured database and append the
/// coefficients. The connection lives only for the duration of this call.
pub fn run_calibration(config: &AppConfig) -> FitResult<CalibrationReport> {
    let mut store = CalibrationStore::open(&config.database)?;
    calibrate(&mut store, &config.fit)
}

/// Same as [`run_calibration`] against an already open store.
pub fn calibrate(
    store: &mut CalibrationStore,
    fit_config: &FitConfig,
) -> FitResult<CalibrationReport> {
    let batch = store.latest_batch()?;
    info!("Most recent training batch: {}", batch);

    let samples = store.load_batch(&batch)?;
    if samples.is_empty() {
        return Err(FitError::NoTrainingData);
    }
    if samples.len() < fit_config.min_samples {
        return Err(FitError::TooFewSamples {
            batch,
            found: samples.len(),
            required: fit_config.min_samples,
        });
    }

    let fit = regression::fit(&samples)?;
    let (x_metrics, y_metrics) = fit.metrics(&samples);
    info!(
        "Fit residuals: x rms={:.4} max={:.4}, y rms={:.4} max={:.4}",
        x_metrics.rms_error, x_metrics.max_error, y_metrics.rms_error, y_metrics.max_error
    );

    let time_created = store.current_datetime()?;
    let row = CoefficientRow::new(fit.x, fit.y, time_created.clone());
    store.insert_coefficients(&row)?;

    Ok(CalibrationReport {
        batch_time: batch,
        time_created,
        sample_count: samples.len(),
        x_metrics,
        y_metrics,
    })
}
