//! Unit-checked quantities and parsing of unit-bearing text.
//!
//! Configuration files and raw-data attributes carry units as text. Every
//! such value is turned into a `uom` quantity here, so a length given where
//! an angle is expected fails with [`Error::UnitMismatch`] instead of
//! flowing silently into a formula.

use crate::error::{Error, Result};
use uom::si::angle::{degree, radian};
use uom::si::f64::{Angle, Frequency, Length};
use uom::si::frequency::hertz;
use uom::si::length::{angstrom, centimeter, meter, micrometer, millimeter, nanometer};

/// Splits `"4.0 m"` / `"4.0m"` into its number and unit symbol.
fn split_value(quantity: &str, text: &str) -> Result<(f64, String)> {
    let text = text.trim();
    let split = text
        .char_indices()
        .find(|&(idx, c)| {
            let exponent = (c == 'e' || c == 'E')
                && text[idx + c.len_utf8()..]
                    .chars()
                    .next()
                    .is_some_and(|n| n.is_ascii_digit() || n == '-' || n == '+');
            !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+' || exponent)
        })
        .map_or(text.len(), |(idx, _)| idx);

    let (number, unit) = text.split_at(split);
    let value: f64 = number.trim().parse().map_err(|_| {
        Error::ConfigError(format!("cannot parse a number for {quantity} from '{text}'"))
    })?;
    Ok((value, unit.trim().to_string()))
}

/// Parses a length such as `"10.11 mm"` or `"2.4 Aa"`.
///
/// # Errors
/// Returns `UnitMismatch` if the unit is not a length.
pub fn parse_length(quantity: &str, text: &str) -> Result<Length> {
    let (value, unit) = split_value(quantity, text)?;
    length_from_unit(quantity, value, &unit)
}

/// Builds a length from a numeric value and a unit symbol.
///
/// # Errors
/// Returns `UnitMismatch` if the unit is not a length.
pub fn length_from_unit(quantity: &str, value: f64, unit: &str) -> Result<Length> {
    let length = match unit {
        "m" | "meter" | "metre" | "meters" | "metres" => Length::new::<meter>(value),
        "cm" => Length::new::<centimeter>(value),
        "mm" => Length::new::<millimeter>(value),
        "um" | "µm" => Length::new::<micrometer>(value),
        "nm" => Length::new::<nanometer>(value),
        "Aa" | "A" | "Å" | "angstrom" | "angstroms" => Length::new::<angstrom>(value),
        other => return Err(Error::unit_mismatch(quantity, "length", other)),
    };
    Ok(length)
}

/// Parses an angle such as `"5 deg"` or `"0.1 rad"`.
///
/// # Errors
/// Returns `UnitMismatch` if the unit is not an angle.
pub fn parse_angle(quantity: &str, text: &str) -> Result<Angle> {
    let (value, unit) = split_value(quantity, text)?;
    angle_from_unit(quantity, value, &unit)
}

/// Builds an angle from a numeric value and a unit symbol.
///
/// # Errors
/// Returns `UnitMismatch` if the unit is not an angle.
pub fn angle_from_unit(quantity: &str, value: f64, unit: &str) -> Result<Angle> {
    let angle = match unit {
        "deg" | "degree" | "degrees" | "°" => Angle::new::<degree>(value),
        "rad" | "radian" | "radians" => Angle::new::<radian>(value),
        other => return Err(Error::unit_mismatch(quantity, "angle", other)),
    };
    Ok(angle)
}

/// Parses a rotation frequency such as `"6.667 Hz"` or `"400 rpm"`.
///
/// # Errors
/// Returns `UnitMismatch` if the unit is not a frequency.
pub fn parse_frequency(quantity: &str, text: &str) -> Result<Frequency> {
    let (value, unit) = split_value(quantity, text)?;
    let frequency = match unit.as_str() {
        "Hz" | "hz" | "1/s" | "s^-1" => Frequency::new::<hertz>(value),
        "rpm" => Frequency::new::<hertz>(value / 60.0),
        other => return Err(Error::unit_mismatch(quantity, "frequency", other)),
    };
    Ok(frequency)
}

/// Checks that a unit label attached to raw data names the expected unit.
///
/// Raw event times must be in nanoseconds and motor readings in degrees;
/// anything else is rejected rather than rescaled, as the file layout fixes
/// both.
///
/// # Errors
/// Returns `UnitMismatch` if `found` is not one of the spellings of `expected`.
pub fn expect_unit(quantity: &str, expected: &'static str, found: &str) -> Result<()> {
    let accepted: &[&str] = match expected {
        "ns" => &["ns", "nanosecond", "nanoseconds"],
        "deg" => &["deg", "degree", "degrees"],
        "s" => &["s", "second", "seconds"],
        _ => &[],
    };
    if accepted.contains(&found.trim()) {
        Ok(())
    } else {
        Err(Error::unit_mismatch(quantity, expected, found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_length_units() {
        let pitch = parse_length("blade_pitch", "10.11 mm").unwrap();
        assert_relative_eq!(pitch.get::<meter>(), 10.11e-3, max_relative = 1e-12);

        let cut = parse_length("lambda_cut", "2.4Aa").unwrap();
        assert_relative_eq!(cut.get::<meter>(), 2.4e-10, max_relative = 1e-12);

        let distance = parse_length("distance", "1.9e1 m").unwrap();
        assert_relative_eq!(distance.get::<meter>(), 19.0, max_relative = 1e-12);
    }

    #[test]
    fn test_parse_angle_units() {
        let tilt = parse_angle("detector_angle", "5 deg").unwrap();
        assert_relative_eq!(tilt.get::<degree>(), 5.0, max_relative = 1e-12);

        let small = parse_angle("offset", "-0.01 rad").unwrap();
        assert_relative_eq!(small.get::<radian>(), -0.01, max_relative = 1e-12);
    }

    #[test]
    fn test_parse_frequency_units() {
        let speed = parse_frequency("chopper_speed", "400 rpm").unwrap();
        assert_relative_eq!(speed.get::<hertz>(), 400.0 / 60.0, max_relative = 1e-12);
    }

    #[test]
    fn test_wrong_dimension_is_unit_mismatch() {
        let err = parse_angle("detector_angle", "5 m").unwrap_err();
        assert!(matches!(err, Error::UnitMismatch { expected: "angle", .. }));

        let err = parse_length("sample_size", "10 deg").unwrap_err();
        assert!(matches!(err, Error::UnitMismatch { expected: "length", .. }));

        let err = parse_length("sample_size", "10").unwrap_err();
        assert!(matches!(err, Error::UnitMismatch { .. }));
    }

    #[test]
    fn test_unparseable_number() {
        let err = parse_length("sample_size", "ten mm").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_expect_unit() {
        assert!(expect_unit("event_time_offset", "ns", "ns").is_ok());
        assert!(expect_unit("som", "deg", "degree").is_ok());
        assert!(expect_unit("event_time_offset", "ns", "s").is_err());
    }
}
