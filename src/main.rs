use log::{error, info};
use sensefit::{logger, run_calibration, AppConfig, FitError};

fn main() {
    logger::init_logger();

    if let Err(e) = run() {
        error!("Calibration failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), FitError> {
    let config = AppConfig::load()?;
    info!("Using calibration database {}", config.get_database_path().display());

    let report = run_calibration(&config)?;
    for line in report.summary_lines() {
        println!("{}", line);
    }
    Ok(())
}
