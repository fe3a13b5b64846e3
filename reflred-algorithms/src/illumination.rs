//! Footprint (illumination) correction for a Gaussian beam.

use rayon::prelude::*;
use reflred_core::{Footprint, Length};
use statrs::function::erf::erf;
use std::f64::consts::PI;
use uom::si::length::meter;

/// Scale applied to the projected sample length before `erf`.
///
/// Treats the beam size as a Gaussian FWHM, `2 * sqrt(2 ln 2)`.
pub const GAUSSIAN_FWHM_SCALE: f64 = 2.35482;

/// Fraction of a Gaussian beam intercepted by the sample at `theta_deg`.
///
/// The sample length is projected with the small-angle form
/// `sample_size * theta * pi / 180`. At zero angle nothing is intercepted
/// and the factor is 0; at grazing angles well above the beam/sample ratio
/// it saturates at 1.
#[must_use]
pub fn illumination_correction(beam_size: Length, sample_size: Length, theta_deg: f64) -> f64 {
    let ratio = sample_size.get::<meter>() / beam_size.get::<meter>();
    erf(ratio * theta_deg * PI / 180.0 * GAUSSIAN_FWHM_SCALE)
}

/// Illumination factor for every angle in `theta_deg`.
#[must_use]
pub fn illumination_factors(footprint: &Footprint, theta_deg: &[f64]) -> Vec<f64> {
    theta_deg
        .par_iter()
        .map(|&theta| illumination_correction(footprint.beam_size, footprint.sample_size, theta))
        .collect()
}
