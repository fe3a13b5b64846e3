//! Linear calibration of the supermirror reference.

use reflred_core::{Histogram1D, Result};

/// Reflectivity of the reference supermirror, linear in `qz`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupermirrorCalibration {
    /// Slope per 1/angstrom.
    pub slope: f64,
    /// Reflectivity extrapolated to `qz = 0`.
    pub intercept: f64,
}

impl Default for SupermirrorCalibration {
    fn default() -> Self {
        Self {
            slope: -2.551_020_408_163_265_3,
            intercept: 1.028_061_224_489_796,
        }
    }
}

impl SupermirrorCalibration {
    /// Creates a calibration line.
    #[must_use]
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    /// Reflectivity at a single `qz`.
    #[inline]
    #[must_use]
    pub fn reflectivity(&self, qz: f64) -> f64 {
        self.slope * qz + self.intercept
    }

    /// Reflectivity at each bin centre of `histogram`.
    #[must_use]
    pub fn factors(&self, histogram: &Histogram1D) -> Vec<f64> {
        histogram
            .centers()
            .into_iter()
            .map(|q| self.reflectivity(q))
            .collect()
    }

    /// Divides a reference histogram by the supermirror reflectivity.
    ///
    /// # Errors
    /// Propagates `LengthMismatch` from the histogram division.
    pub fn correct(&self, reference: &mut Histogram1D) -> Result<()> {
        let factors = self.factors(reference);
        reference.divide_by(&factors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_factors_at_bin_centres() {
        let calibration = SupermirrorCalibration::default();
        let histogram = Histogram1D::new(vec![0.0, 0.02, 0.04]).unwrap();
        let factors = calibration.factors(&histogram);
        assert_relative_eq!(factors[0], -2.551_020_408_163_265_3 * 0.01 + 1.028_061_224_489_796);
        assert_relative_eq!(
            factors[1],
            -2.551_020_408_163_265_3 * 0.03 + 1.028_061_224_489_796,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_correct_scales_variance() {
        let calibration = SupermirrorCalibration::new(0.0, 0.5);
        let mut histogram = Histogram1D::new(vec![0.0, 1.0]).unwrap();
        histogram.fill(0.5, 2.0, 3.0);
        calibration.correct(&mut histogram).unwrap();
        assert_relative_eq!(histogram.values[0], 4.0);
        assert_relative_eq!(histogram.variances[0], 12.0);
    }
}
