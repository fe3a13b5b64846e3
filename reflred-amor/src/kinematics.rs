//! Geometric and kinematic reconstruction of AMOR events.
//!
//! The stages run in a fixed order and each one takes the output of the
//! previous one by type:
//!
//! 1. [`fold_time_of_flight`] - reference raw times to the wavelength cut
//! 2. [`detector_reconstruction`] - pixel ids to blade/z/y and positions
//! 3. [`tof_to_lambda`] - flight path and wavelength
//! 4. [`find_theta`] - reflection angle, optionally gravity corrected
//! 5. [`find_qz`] - momentum transfer in 1/angstrom
//!
//! Per-event columns are plain `f64` in the unit named by the field suffix;
//! configuration enters as `uom` quantities and is converted once per call.
#![allow(clippy::cast_precision_loss)]

use crate::geometry::InstrumentGeometry;
use crate::pixel::PixelAddress;
use rayon::prelude::*;
use reflred_core::constants::{HDM_SI, METERS_PER_ANGSTROM};
use reflred_core::{Angle, Length, Time};
use std::f64::consts::PI;
use uom::si::angle::{degree, radian};
use uom::si::length::{meter, millimeter};
use uom::si::time::second;

/// Empirical parabolic-drop coefficient of the instrument, in 1/m^2 when
/// distances and wavelengths are in metres.
pub const GRAVITY_DROP_COEFFICIENT: f64 = -3.07;

/// Wire spacing on a detector blade.
const WIRE_SPACING_MM: f64 = 4.0;

/// Strip spacing across a detector blade.
const STRIP_SPACING_MM: f64 = 1.0;

/// Motor readings of the detector and sample horizons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonAngles {
    /// Detector horizon (negated `com` reading).
    pub detector: Angle,
    /// Sample horizon (`som` reading plus configured offset).
    pub sample: Angle,
}

/// Folds raw times of flight into the window that starts at the wavelength cut.
///
/// `adjusted = ((raw - cut + tau) mod tau) + cut + offset`, with the modulo
/// taken so the remainder lies in `[0, tau)`.
#[must_use]
pub fn fold_time_of_flight(raw_s: &[f64], tau: Time, tof_cut: Time, tof_offset: Time) -> Vec<f64> {
    let tau = tau.get::<second>();
    let cut = tof_cut.get::<second>();
    let offset = tof_offset.get::<second>();
    raw_s
        .par_iter()
        .map(|&t| {
            let mut folded = (t - cut + tau).rem_euclid(tau);
            // rem_euclid can round up to exactly tau for tiny negative inputs
            if folded >= tau {
                folded = 0.0;
            }
            folded + cut + offset
        })
        .collect()
}

/// Blade/z/y indices and physical positions of each event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorPositions {
    pub blade: Vec<u32>,
    pub z_on_blade: Vec<u32>,
    pub y_index: Vec<u32>,
    /// Horizontal position across the blade.
    pub y_m: Vec<f64>,
    /// Vertical position relative to the detector centre.
    pub z_m: Vec<f64>,
}

impl DetectorPositions {
    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blade.len()
    }

    /// Returns true if there are no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blade.is_empty()
    }
}

/// Decomposes pixel ids and places each event on the tilted blade stack.
///
/// `z = 2.5 * pitch - blade * pitch - z_on_blade * 4 mm * sin(detector_angle)`
#[must_use]
pub fn detector_reconstruction(
    pixel_id: &[u32],
    blade_pitch: Length,
    detector_angle: Angle,
) -> DetectorPositions {
    let pitch_m = blade_pitch.get::<meter>();
    let detector_dz_m = (Length::new::<millimeter>(WIRE_SPACING_MM)
        * detector_angle.get::<radian>().sin())
    .get::<meter>();
    let strip_m = Length::new::<millimeter>(STRIP_SPACING_MM).get::<meter>();
    let detector_zero_m = 2.5 * pitch_m;

    let addresses: Vec<PixelAddress> = pixel_id
        .par_iter()
        .map(|&id| PixelAddress::from_pixel_id(id))
        .collect();

    let y_m = addresses
        .par_iter()
        .map(|a| f64::from(a.y) * strip_m)
        .collect();
    let z_m = addresses
        .par_iter()
        .map(|a| detector_zero_m - f64::from(a.blade) * pitch_m - f64::from(a.z) * detector_dz_m)
        .collect();

    DetectorPositions {
        blade: addresses.iter().map(|a| a.blade).collect(),
        z_on_blade: addresses.iter().map(|a| a.z).collect(),
        y_index: addresses.iter().map(|a| a.y).collect(),
        y_m,
        z_m,
    }
}

/// Flight path and wavelength of each event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wavelengths {
    pub flight_path_m: Vec<f64>,
    pub wavelength_m: Vec<f64>,
}

/// Converts folded time of flight to wavelength.
///
/// The flight path is the chopper–detector distance, plus the depth of the
/// wire along the tilted blade, plus the extra sample–detector path when the
/// detector arm is raised off the horizon.
#[must_use]
pub fn tof_to_lambda(
    tof_s: &[f64],
    positions: &DetectorPositions,
    geometry: &InstrumentGeometry,
    horizons: &HorizonAngles,
) -> Wavelengths {
    let chopper_detector_m = geometry.chopper_detector_distance.get::<meter>();
    let sample_detector_m = geometry.sample_detector_distance.get::<meter>();
    let detector_dx_m = (Length::new::<millimeter>(WIRE_SPACING_MM)
        * geometry.detector_angle.get::<radian>().cos())
    .get::<meter>();
    let horizon_extra_m =
        sample_detector_m * (1.0 / horizons.detector.get::<radian>().cos() - 1.0);

    let flight_path_m: Vec<f64> = positions
        .z_on_blade
        .par_iter()
        .map(|&z| chopper_detector_m + f64::from(z) * detector_dx_m + horizon_extra_m)
        .collect();

    let wavelength_m = tof_s
        .par_iter()
        .zip(flight_path_m.par_iter())
        .map(|(&tof, &path)| tof * HDM_SI / path)
        .collect();

    Wavelengths {
        flight_path_m,
        wavelength_m,
    }
}

/// Parabolic drop of a neutron of wavelength `wavelength_m` over `distance_m`.
#[inline]
#[must_use]
pub fn gravity_drop_m(distance_m: f64, wavelength_m: f64) -> f64 {
    GRAVITY_DROP_COEFFICIENT * distance_m * distance_m * wavelength_m * wavelength_m
}

/// Gravity-corrected reflection angle of one event, in degrees.
///
/// With the sample horizon above zero the detector sits above the direct
/// beam; otherwise the whole expression changes sign.
#[inline]
#[must_use]
pub fn theta_with_gravity_deg(
    sample_horizon_deg: f64,
    z_m: f64,
    distance_m: f64,
    wavelength_m: f64,
) -> f64 {
    let drop = gravity_drop_m(distance_m, wavelength_m);
    let theta = sample_horizon_deg + z_m.atan2(distance_m).to_degrees()
        - drop.atan2(distance_m).to_degrees();
    if sample_horizon_deg > 0.0 {
        theta
    } else {
        -theta
    }
}

/// Small-angle reflection angle of one event, in degrees.
#[inline]
#[must_use]
pub fn theta_small_angle_deg(
    detector_horizon_deg: f64,
    sample_horizon_deg: f64,
    z_m: f64,
    distance_m: f64,
) -> f64 {
    detector_horizon_deg - sample_horizon_deg + z_m / distance_m * 180.0 / PI
}

/// Reflection angle of each event, in degrees.
#[must_use]
pub fn find_theta(
    positions: &DetectorPositions,
    wavelengths: &Wavelengths,
    geometry: &InstrumentGeometry,
    horizons: &HorizonAngles,
    gravity: bool,
) -> Vec<f64> {
    let distance_m = geometry.sample_detector_distance.get::<meter>();
    let sample_deg = horizons.sample.get::<degree>();
    let detector_deg = horizons.detector.get::<degree>();

    if gravity {
        positions
            .z_m
            .par_iter()
            .zip(wavelengths.wavelength_m.par_iter())
            .map(|(&z, &lambda)| theta_with_gravity_deg(sample_deg, z, distance_m, lambda))
            .collect()
    } else {
        positions
            .z_m
            .par_iter()
            .map(|&z| theta_small_angle_deg(detector_deg, sample_deg, z, distance_m))
            .collect()
    }
}

/// Momentum transfer `4 pi sin(theta) / lambda` in 1/angstrom.
#[must_use]
pub fn find_qz(theta_deg: &[f64], wavelength_m: &[f64]) -> Vec<f64> {
    theta_deg
        .par_iter()
        .zip(wavelength_m.par_iter())
        .map(|(&theta, &lambda)| 4.0 * PI * theta.to_radians().sin() / lambda * METERS_PER_ANGSTROM)
        .collect()
}
