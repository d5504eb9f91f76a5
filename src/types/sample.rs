/// One stored calibration sample: the screen target and the two line-sensor
/// readings captured while the target was shown.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationSample {
    pub x: f64,
    pub y: f64,
    pub l45: f64,
    pub l90: f64,
}

impl CalibrationSample {
    pub fn new(x: f64, y: f64, l45: f64, l90: f64) -> Self {
        Self { x, y, l45, l90 }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.l45.is_finite() && self.l90.is_finite()
    }
}
