//! Instrument geometry and acceptance configuration for AMOR.

use reflred_core::constants::hdm;
use reflred_core::units::{parse_angle, parse_frequency, parse_length};
use reflred_core::{Angle, Error, Footprint, Frequency, Length, Result, Time};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use uom::si::angle::degree;
use uom::si::frequency::hertz;
use uom::si::length::{angstrom, meter, millimeter};

/// Acceptance window applied by the masks.
///
/// `lambda_max = None` means "one chopper period above `lambda_min`", which
/// is resolved against the geometry when the masks are applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcceptanceBounds {
    pub y_min: Length,
    pub y_max: Length,
    pub lambda_min: Length,
    pub lambda_max: Option<Length>,
    pub theta_min: Angle,
    pub theta_max: Angle,
}

impl Default for AcceptanceBounds {
    fn default() -> Self {
        Self {
            y_min: Length::new::<millimeter>(1.0),
            y_max: Length::new::<millimeter>(29.0),
            lambda_min: Length::new::<angstrom>(2.4),
            lambda_max: None,
            theta_min: Angle::new::<degree>(0.0),
            theta_max: Angle::new::<degree>(180.0),
        }
    }
}

/// AMOR geometry, fixed for the lifetime of a reader.
#[derive(Clone, Debug, PartialEq)]
pub struct InstrumentGeometry {
    /// Chopper rotation frequency.
    pub chopper_speed: Frequency,
    /// Phase between chopper opening and the time-of-flight zero.
    pub chopper_phase: Angle,
    /// Wavelength at which the time-of-flight window is cut.
    pub lambda_cut: Length,
    pub sample_detector_distance: Length,
    pub chopper_detector_distance: Length,
    /// Tilt of the detector blades.
    pub detector_angle: Angle,
    /// Distance between neighbouring detector blades.
    pub detector_blade_pitch: Length,
    /// Correction added to the sample horizon motor reading.
    pub sample_angle_horizon_offset: Angle,
    /// Sample length along the beam.
    pub sample_size: Length,
    /// Beam width perpendicular to the sample.
    pub beam_size: Length,
    /// Correct the reflection angle for the gravitational drop.
    pub gravity: bool,
    pub bounds: AcceptanceBounds,
}

impl Default for InstrumentGeometry {
    fn default() -> Self {
        Self::amor_defaults()
    }
}

// Intermediate structs for the JSON schema; every value is a unit-bearing
// string and every field may be omitted.
#[derive(Deserialize)]
struct JsonConfig {
    #[serde(default)]
    instrument: JsonInstrument,
    #[serde(default)]
    masks: JsonMasks,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonInstrument {
    chopper_speed: Option<String>,
    chopper_phase: Option<String>,
    lambda_cut: Option<String>,
    sample_detector_distance: Option<String>,
    chopper_detector_distance: Option<String>,
    detector_angle: Option<String>,
    detector_blade_pitch: Option<String>,
    sample_angle_horizon_offset: Option<String>,
    sample_size: Option<String>,
    beam_size: Option<String>,
    gravity: Option<bool>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonMasks {
    y_min: Option<String>,
    y_max: Option<String>,
    lambda_min: Option<String>,
    lambda_max: Option<String>,
    theta_min: Option<String>,
    theta_max: Option<String>,
}

impl InstrumentGeometry {
    /// AMOR default configuration.
    #[must_use]
    pub fn amor_defaults() -> Self {
        Self {
            chopper_speed: Frequency::new::<hertz>(20.0 / 3.0),
            chopper_phase: Angle::new::<degree>(-8.0),
            lambda_cut: Length::new::<angstrom>(2.4),
            sample_detector_distance: Length::new::<meter>(4.0),
            chopper_detector_distance: Length::new::<meter>(19.0),
            detector_angle: Angle::new::<degree>(5.0),
            detector_blade_pitch: Length::new::<millimeter>(10.11),
            sample_angle_horizon_offset: Angle::new::<degree>(0.0),
            sample_size: Length::new::<millimeter>(10.0),
            beam_size: Length::new::<millimeter>(1.0),
            gravity: true,
            bounds: AcceptanceBounds::default(),
        }
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    /// Returns `ConfigError` for unreadable or malformed files and
    /// `UnitMismatch` for values in the wrong unit.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))?;
        let json_config: JsonConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))?;
        Self::from_json_config(json_config)
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    /// Returns `ConfigError` for malformed JSON and `UnitMismatch` for values
    /// in the wrong unit.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let json_config: JsonConfig =
            serde_json::from_str(json).map_err(|e| Error::ConfigError(e.to_string()))?;
        Self::from_json_config(json_config)
    }

    fn from_json_config(config: JsonConfig) -> Result<Self> {
        let mut geometry = Self::amor_defaults();
        let instrument = config.instrument;
        let masks = config.masks;

        if let Some(text) = instrument.chopper_speed {
            geometry.chopper_speed = parse_frequency("chopper_speed", &text)?;
        }
        if let Some(text) = instrument.chopper_phase {
            geometry.chopper_phase = parse_angle("chopper_phase", &text)?;
        }
        if let Some(text) = instrument.lambda_cut {
            geometry.lambda_cut = parse_length("lambda_cut", &text)?;
        }
        if let Some(text) = instrument.sample_detector_distance {
            geometry.sample_detector_distance = parse_length("sample_detector_distance", &text)?;
        }
        if let Some(text) = instrument.chopper_detector_distance {
            geometry.chopper_detector_distance = parse_length("chopper_detector_distance", &text)?;
        }
        if let Some(text) = instrument.detector_angle {
            geometry.detector_angle = parse_angle("detector_angle", &text)?;
        }
        if let Some(text) = instrument.detector_blade_pitch {
            geometry.detector_blade_pitch = parse_length("detector_blade_pitch", &text)?;
        }
        if let Some(text) = instrument.sample_angle_horizon_offset {
            geometry.sample_angle_horizon_offset =
                parse_angle("sample_angle_horizon_offset", &text)?;
        }
        if let Some(text) = instrument.sample_size {
            geometry.sample_size = parse_length("sample_size", &text)?;
        }
        if let Some(text) = instrument.beam_size {
            geometry.beam_size = parse_length("beam_size", &text)?;
        }
        if let Some(gravity) = instrument.gravity {
            geometry.gravity = gravity;
        }

        if let Some(text) = masks.y_min {
            geometry.bounds.y_min = parse_length("y_min", &text)?;
        }
        if let Some(text) = masks.y_max {
            geometry.bounds.y_max = parse_length("y_max", &text)?;
        }
        if let Some(text) = masks.lambda_min {
            geometry.bounds.lambda_min = parse_length("lambda_min", &text)?;
        }
        if let Some(text) = masks.lambda_max {
            geometry.bounds.lambda_max = Some(parse_length("lambda_max", &text)?);
        }
        if let Some(text) = masks.theta_min {
            geometry.bounds.theta_min = parse_angle("theta_min", &text)?;
        }
        if let Some(text) = masks.theta_max {
            geometry.bounds.theta_max = parse_angle("theta_max", &text)?;
        }

        geometry.validate()?;
        Ok(geometry)
    }

    /// Checks values that would make the reconstruction meaningless.
    ///
    /// # Errors
    /// Returns `ConfigError` naming the offending value.
    pub fn validate(&self) -> Result<()> {
        let positive_lengths = [
            ("sample_detector_distance", self.sample_detector_distance),
            ("chopper_detector_distance", self.chopper_detector_distance),
            ("detector_blade_pitch", self.detector_blade_pitch),
            ("sample_size", self.sample_size),
            ("beam_size", self.beam_size),
        ];
        for (name, value) in positive_lengths {
            let metres = value.get::<meter>();
            if metres.is_nan() || metres <= 0.0 {
                return Err(Error::ConfigError(format!(
                    "{name} must be positive, got {metres} m"
                )));
            }
        }
        let speed = self.chopper_speed.get::<hertz>();
        if speed.is_nan() || speed <= 0.0 {
            return Err(Error::ConfigError(format!(
                "chopper_speed must be positive, got {speed} Hz"
            )));
        }
        Ok(())
    }

    /// Chopper half-period τ = 1 / (2 · speed).
    #[must_use]
    pub fn tau(&self) -> Time {
        (self.chopper_speed * 2.0).recip()
    }

    /// Time of flight of a neutron at `lambda_cut` over the chopper–detector path.
    #[must_use]
    pub fn tof_cut(&self) -> Time {
        self.lambda_cut * self.chopper_detector_distance / hdm()
    }

    /// Time offset set by the chopper phase: τ · phase / 180°.
    #[must_use]
    pub fn tof_offset(&self) -> Time {
        self.tau() * (self.chopper_phase.get::<degree>() / 180.0)
    }

    /// Width of the wavelength band covered by one chopper period.
    #[must_use]
    pub fn wavelength_band(&self) -> Length {
        self.tau() * hdm() / self.chopper_detector_distance
    }

    /// Upper wavelength bound: explicit if configured, otherwise one band
    /// above the lower bound.
    #[must_use]
    pub fn lambda_max(&self, bounds: &AcceptanceBounds) -> Length {
        bounds
            .lambda_max
            .unwrap_or_else(|| bounds.lambda_min + self.wavelength_band())
    }

    /// Beam and sample extents for the illumination correction.
    #[must_use]
    pub fn footprint(&self) -> Footprint {
        Footprint {
            beam_size: self.beam_size,
            sample_size: self.sample_size,
        }
    }

    /// Set the chopper speed.
    #[must_use]
    pub fn with_chopper_speed(mut self, speed: Frequency) -> Self {
        self.chopper_speed = speed;
        self
    }

    /// Set the chopper phase.
    #[must_use]
    pub fn with_chopper_phase(mut self, phase: Angle) -> Self {
        self.chopper_phase = phase;
        self
    }

    /// Enable or disable the gravity correction.
    #[must_use]
    pub fn with_gravity(mut self, gravity: bool) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the sample horizon offset.
    #[must_use]
    pub fn with_sample_angle_horizon_offset(mut self, offset: Angle) -> Self {
        self.sample_angle_horizon_offset = offset;
        self
    }

    /// Set beam and sample sizes.
    #[must_use]
    pub fn with_footprint(mut self, beam_size: Length, sample_size: Length) -> Self {
        self.beam_size = beam_size;
        self.sample_size = sample_size;
        self
    }

    /// Set the acceptance bounds.
    #[must_use]
    pub fn with_bounds(mut self, bounds: AcceptanceBounds) -> Self {
        self.bounds = bounds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use reflred_core::constants::HDM_SI;
    use uom::si::time::second;

    #[test]
    fn test_amor_defaults() {
        let geometry = InstrumentGeometry::amor_defaults();
        assert_relative_eq!(geometry.tau().get::<second>(), 0.075, max_relative = 1e-12);
        assert!(geometry.gravity);
        assert!(geometry.bounds.lambda_max.is_none());
        assert!(geometry.validate().is_ok());
    }

    #[test]
    fn test_derived_times() {
        let geometry = InstrumentGeometry::amor_defaults();
        let tof_cut = geometry.tof_cut().get::<second>();
        assert_relative_eq!(tof_cut, 2.4e-10 * 19.0 / HDM_SI, max_relative = 1e-12);

        let offset = geometry.tof_offset().get::<second>();
        assert_relative_eq!(offset, 0.075 * -8.0 / 180.0, max_relative = 1e-12);
    }

    #[test]
    fn test_default_lambda_max_is_one_band_above_min() {
        let geometry = InstrumentGeometry::amor_defaults();
        let lambda_max = geometry.lambda_max(&geometry.bounds).get::<meter>();
        assert_relative_eq!(
            lambda_max,
            2.4e-10 + 0.075 * HDM_SI / 19.0,
            max_relative = 1e-12
        );

        let explicit = AcceptanceBounds {
            lambda_max: Some(Length::new::<angstrom>(10.0)),
            ..AcceptanceBounds::default()
        };
        assert_relative_eq!(
            geometry.lambda_max(&explicit).get::<meter>(),
            1.0e-9,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_json_partial_config() {
        let json = r#"{
            "instrument": {
                "chopper_speed": "10 Hz",
                "detector_angle": "4 deg",
                "gravity": false
            },
            "masks": { "lambda_max": "12 Aa" }
        }"#;

        let geometry = InstrumentGeometry::from_json_str(json).unwrap();
        assert_relative_eq!(geometry.chopper_speed.get::<hertz>(), 10.0, max_relative = 1e-12);
        assert_relative_eq!(geometry.detector_angle.get::<degree>(), 4.0, max_relative = 1e-12);
        assert!(!geometry.gravity);
        assert_relative_eq!(
            geometry.bounds.lambda_max.unwrap().get::<angstrom>(),
            12.0,
            max_relative = 1e-12
        );
        // Untouched values keep their defaults
        assert_relative_eq!(
            geometry.chopper_detector_distance.get::<meter>(),
            19.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_json_empty_document() {
        let geometry = InstrumentGeometry::from_json_str("{}").unwrap();
        assert_eq!(geometry, InstrumentGeometry::amor_defaults());
    }

    #[test]
    fn test_json_unit_mismatch() {
        let json = r#"{ "instrument": { "detector_angle": "5 mm" } }"#;
        let err = InstrumentGeometry::from_json_str(json).unwrap_err();
        assert!(matches!(err, Error::UnitMismatch { .. }), "{err}");
    }

    #[test]
    fn test_json_rejects_non_positive_distance() {
        let json = r#"{ "instrument": { "sample_detector_distance": "0 m" } }"#;
        assert!(matches!(
            InstrumentGeometry::from_json_str(json),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "instrument": {{ "beam_size": "2 mm" }} }}"#).unwrap();
        let geometry = InstrumentGeometry::from_file(file.path()).unwrap();
        assert_relative_eq!(geometry.beam_size.get::<millimeter>(), 2.0, max_relative = 1e-12);

        assert!(InstrumentGeometry::from_file("/nonexistent/geometry.json").is_err());
    }
}
