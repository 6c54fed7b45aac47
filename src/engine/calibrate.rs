//! Raw score → bounded confidence.

use serde::{Deserialize, Serialize};

/// Field-specific confidence mapping: `min(1, raw / scale)` clamped to
/// `[floor, ceiling]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub scale: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            scale: 1.0,
            floor: 0.0,
            ceiling: 1.0,
        }
    }
}

impl Calibration {
    pub const fn new(scale: f64, floor: f64, ceiling: f64) -> Self {
        Self {
            scale,
            floor,
            ceiling,
        }
    }

    /// A calibration that always reports `value`.
    pub const fn fixed(value: f64) -> Self {
        Self {
            scale: 1.0,
            floor: value,
            ceiling: value,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scale.is_nan() || self.scale <= 0.0 {
            anyhow::bail!("calibration scale must be positive, got {}", self.scale);
        }
        if !(0.0..=1.0).contains(&self.floor) || !(0.0..=1.0).contains(&self.ceiling) {
            anyhow::bail!(
                "calibration bounds must lie in [0, 1], got floor {} ceiling {}",
                self.floor,
                self.ceiling
            );
        }
        if self.floor > self.ceiling {
            anyhow::bail!(
                "calibration floor {} exceeds ceiling {}",
                self.floor,
                self.ceiling
            );
        }
        Ok(())
    }
}

/// Map the winning candidate's raw score to a confidence.
///
/// Only called for found results; a not-found result always reports `0.0`.
pub fn calibrate(raw_score: f64, calibration: &Calibration) -> f64 {
    let scaled = (raw_score / calibration.scale).min(1.0);
    scaled.clamp(calibration.floor, calibration.ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibrate_scale_and_clamps() {
        let c = Calibration::new(162.0, 0.45, 1.0);
        assert!((calibrate(81.0, &c) - 0.5).abs() < 1e-9);
        assert_eq!(calibrate(10.0, &c), 0.45);
        assert_eq!(calibrate(500.0, &c), 1.0);
        assert_eq!(calibrate(-3.0, &c), 0.45);
    }

    #[test]
    fn test_calibrate_is_monotonic() {
        let c = Calibration::new(1.2, 0.3, 0.98);
        let mut last = 0.0;
        for step in 0..200 {
            let value = calibrate(step as f64 * 0.01, &c);
            assert!(value >= last);
            last = value;
        }
    }

    #[test]
    fn test_fixed_calibration() {
        let c = Calibration::fixed(0.95);
        assert_eq!(calibrate(0.1, &c), 0.95);
        assert_eq!(calibrate(99.0, &c), 0.95);
    }

    #[test]
    fn test_validate() {
        assert!(Calibration::new(0.0, 0.0, 1.0).validate().is_err());
        assert!(Calibration::new(1.0, 0.9, 0.5).validate().is_err());
        assert!(Calibration::new(1.0, 0.0, 1.5).validate().is_err());
        assert!(Calibration::new(1.0, 0.45, 1.0).validate().is_ok());
    }
}
