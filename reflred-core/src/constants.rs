//! Physical constants used by the reduction.
//!
//! Values are CODATA 2018, matching the ones used across the facility's
//! reduction software. They are plain constants so callers thread them
//! explicitly instead of reaching for global state.

use uom::si::diffusion_coefficient::square_meter_per_second;
use uom::si::f64::DiffusionCoefficient;

/// Planck constant in J s.
pub const PLANCK_CONSTANT: f64 = 6.626_070_15e-34;

/// Neutron rest mass in kg.
pub const NEUTRON_MASS_KG: f64 = 1.674_927_498_04e-27;

/// h / m_n in m^2 / s.
pub const HDM_SI: f64 = PLANCK_CONSTANT / NEUTRON_MASS_KG;

/// Metres per angstrom.
pub const METERS_PER_ANGSTROM: f64 = 1.0e-10;

/// h / m_n as a unit-checked quantity (length^2 / time).
///
/// Multiplying a time of flight by this and dividing by a flight path gives
/// the neutron wavelength.
#[must_use]
pub fn hdm() -> DiffusionCoefficient {
    DiffusionCoefficient::new::<square_meter_per_second>(HDM_SI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hdm_value() {
        // 3.956 e-7 m^2/s is the textbook value
        assert_relative_eq!(HDM_SI, 3.956_034e-7, max_relative = 1e-6);
        assert_relative_eq!(hdm().get::<square_meter_per_second>(), HDM_SI);
    }
}
