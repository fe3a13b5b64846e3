//! Acceptance masks on detector y, wavelength and reflection angle.
//!
//! Masks are computed into a fresh [`EventMasks`] and never drop events,
//! so a run can be re-masked with other bounds at any time.

use crate::geometry::AcceptanceBounds;
use rayon::prelude::*;
use reflred_core::{EventMasks, Length};
use uom::si::angle::degree;
use uom::si::length::meter;

/// Rejects values outside `[min, max]`; NaN is rejected too.
#[must_use]
pub fn outside_closed(values: &[f64], min: f64, max: f64) -> Vec<bool> {
    values.par_iter().map(|&v| !(v >= min && v <= max)).collect()
}

/// Rejects values outside `[min, max)`; NaN is rejected too.
#[must_use]
pub fn outside_half_open(values: &[f64], min: f64, max: f64) -> Vec<bool> {
    values.par_iter().map(|&v| !(v >= min && v < max)).collect()
}

/// Computes the three acceptance masks.
///
/// `lambda_max` is the resolved upper wavelength bound (see
/// [`InstrumentGeometry::lambda_max`](crate::geometry::InstrumentGeometry::lambda_max));
/// events at exactly that wavelength are rejected.
#[must_use]
pub fn apply_masks(
    y_m: &[f64],
    wavelength_m: &[f64],
    theta_deg: &[f64],
    bounds: &AcceptanceBounds,
    lambda_max: Length,
) -> EventMasks {
    EventMasks {
        y: outside_closed(y_m, bounds.y_min.get::<meter>(), bounds.y_max.get::<meter>()),
        wavelength: outside_half_open(
            wavelength_m,
            bounds.lambda_min.get::<meter>(),
            lambda_max.get::<meter>(),
        ),
        theta: outside_closed(
            theta_deg,
            bounds.theta_min.get::<degree>(),
            bounds.theta_max.get::<degree>(),
        ),
    }
}
