//! AMOR raw-file ingestion via HDF5.

use crate::{Error, Result};
use hdf5::types::{FixedAscii, VarLenAscii, VarLenUnicode};
use hdf5::{Container, Dataset, File};
use log::debug;
use reflred_amor::{AmorRawRun, EventReader, InstrumentGeometry};
use reflred_core::units::expect_unit;
use reflred_core::{Angle, RawEventBatch};
use std::path::Path;
use uom::si::angle::degree;

/// Dataset paths of an AMOR raw file.
pub mod paths {
    pub const TITLE: &str = "/experiment/title";
    pub const EVENT_ID: &str = "/experiment/data/event_id";
    pub const EVENT_TIME_OFFSET: &str = "/experiment/data/event_time_offset";
    pub const EVENT_TIME_ZERO: &str = "/experiment/data/event_time_zero";
    pub const PROTON_CURRENT: &str = "/experiment/proton_current/value";
    pub const DETECTOR_HORIZON: &str = "/instrument/stages/com/value";
    pub const SAMPLE_HORIZON: &str = "/instrument/stages/som/value";
}

/// Reads one AMOR raw file.
///
/// The file is closed before returning, on success and on error.
///
/// # Errors
/// Returns `MissingField` for an absent required dataset, `UnitMismatch`
/// when a `units` attribute has the wrong dimension, `LengthMismatch` when
/// the event columns disagree and `Hdf5` for library failures.
pub fn read_amor_hdf5<P: AsRef<Path>>(path: P) -> Result<AmorRawRun> {
    let file = File::open(path.as_ref())?;

    let title = read_first_string(&required_dataset(&file, paths::TITLE)?)?;

    let event_id = required_dataset(&file, paths::EVENT_ID)?.read_raw::<i64>()?;
    let pixel_id = event_id
        .into_iter()
        .map(|id| {
            u32::try_from(id)
                .map_err(|_| Error::InvalidFormat(format!("{}: invalid pixel id {id}", paths::EVENT_ID)))
        })
        .collect::<Result<Vec<u32>>>()?;

    let offsets = required_dataset(&file, paths::EVENT_TIME_OFFSET)?;
    check_units(&offsets, paths::EVENT_TIME_OFFSET, "ns")?;
    let events = RawEventBatch::from_nanoseconds(pixel_id, &offsets.read_raw::<i64>()?)?;

    let detector_horizon_reading = read_motor(&file, paths::DETECTOR_HORIZON)?;
    let sample_horizon_reading = read_motor(&file, paths::SAMPLE_HORIZON)?;

    let proton_current = optional_dataset(&file, paths::PROTON_CURRENT)?
        .map(|ds| ds.read_raw::<f64>())
        .transpose()?;
    let pulse_times_ns = match optional_dataset(&file, paths::EVENT_TIME_ZERO)? {
        Some(ds) => {
            check_units(&ds, paths::EVENT_TIME_ZERO, "ns")?;
            Some(ds.read_raw::<i64>()?)
        }
        None => None,
    };

    debug!(
        "{}: read {} events, proton current {}",
        path.as_ref().display(),
        events.len(),
        if proton_current.is_some() { "present" } else { "absent" }
    );

    Ok(AmorRawRun {
        title,
        events,
        detector_horizon_reading,
        sample_horizon_reading,
        proton_current,
        pulse_times_ns,
    })
}

/// Reads an AMOR raw file and reconstructs it.
///
/// # Errors
/// Propagates read errors and reconstruction errors.
pub fn open_event_reader<P: AsRef<Path>>(
    path: P,
    geometry: InstrumentGeometry,
    mask_data: bool,
) -> Result<EventReader> {
    let raw = read_amor_hdf5(path)?;
    Ok(EventReader::from_raw(raw, geometry, mask_data)?)
}

// Only a missing link means absent; a link that exists but cannot be opened
// as a dataset is an error.
fn optional_dataset(file: &File, path: &str) -> Result<Option<Dataset>> {
    if !link_exists(file, path) {
        return Ok(None);
    }
    Ok(Some(file.dataset(path)?))
}

fn required_dataset(file: &File, path: &str) -> Result<Dataset> {
    optional_dataset(file, path)?
        .ok_or_else(|| reflred_core::Error::MissingField(path.to_string()).into())
}

// Checks every prefix so a missing parent group reads as absent
fn link_exists(file: &File, path: &str) -> bool {
    let mut prefix = String::new();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        prefix.push('/');
        prefix.push_str(part);
        if !file.link_exists(&prefix) {
            return false;
        }
    }
    !prefix.is_empty()
}

fn read_motor(file: &File, path: &str) -> Result<Angle> {
    let dataset = required_dataset(file, path)?;
    check_units(&dataset, path, "deg")?;
    let values = dataset.read_raw::<f64>()?;
    let first = values
        .first()
        .copied()
        .ok_or_else(|| reflred_core::Error::MissingField(format!("{path}[0]")))?;
    Ok(Angle::new::<degree>(first))
}

fn check_units(dataset: &Dataset, path: &str, expected: &'static str) -> Result<()> {
    match dataset.attr("units") {
        Ok(attr) => {
            let found = read_first_string(&attr)?;
            expect_unit(path, expected, &found)?;
            Ok(())
        }
        Err(_) => Ok(()),
    }
}

// Strings in NeXus files come as variable- or fixed-length, UTF-8 or ASCII
fn read_first_string(container: &Container) -> Result<String> {
    if let Ok(values) = container.read_raw::<VarLenUnicode>() {
        return first_or_missing(values.first().map(|v| v.as_str().to_string()), container);
    }
    if let Ok(values) = container.read_raw::<VarLenAscii>() {
        return first_or_missing(values.first().map(|v| v.as_str().to_string()), container);
    }
    let values = container.read_raw::<FixedAscii<256>>()?;
    first_or_missing(values.first().map(|v| v.as_str().to_string()), container)
}

fn first_or_missing(value: Option<String>, container: &Container) -> Result<String> {
    value.ok_or_else(|| reflred_core::Error::MissingField(container.name()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hdf5::types::H5Type;
    use hdf5::Group;
    use ndarray::ArrayView1;
    use reflred_core::MonitorSource;
    use std::str::FromStr;
    use tempfile::NamedTempFile;

    fn write_dataset<T: H5Type>(group: &Group, name: &str, data: &[T]) -> Dataset {
        let dataset = group.new_dataset::<T>().shape((data.len(),)).create(name).unwrap();
        dataset.write(ArrayView1::from(data)).unwrap();
        dataset
    }

    fn set_units(dataset: &Dataset, units: &str) {
        let value = VarLenUnicode::from_str(units).unwrap();
        dataset
            .new_attr::<VarLenUnicode>()
            .create("units")
            .unwrap()
            .write_scalar(&value)
            .unwrap();
    }

    struct Layout {
        proton_current: bool,
        proton_current_as_group: bool,
        pulse_times: bool,
        offset_units: &'static str,
        short_offsets: bool,
    }

    impl Default for Layout {
        fn default() -> Self {
            Self {
                proton_current: true,
                proton_current_as_group: false,
                pulse_times: true,
                offset_units: "ns",
                short_offsets: false,
            }
        }
    }

    fn write_amor_file(layout: &Layout) -> NamedTempFile {
        let tmp = NamedTempFile::new().unwrap();
        let file = File::create(tmp.path()).unwrap();
        let experiment = file.create_group("experiment").unwrap();
        let title = VarLenUnicode::from_str("Ni 1000 A").unwrap();
        write_dataset(&experiment, "title", &[title]);

        let data = experiment.create_group("data").unwrap();
        write_dataset(&data, "event_id", &[10_i64, 1024 + 40, 2 * 1024 + 300]);
        let offsets: &[i64] = if layout.short_offsets {
            &[20_000_000, 30_000_000]
        } else {
            &[20_000_000, 30_000_000, 40_000_000]
        };
        let ds = write_dataset(&data, "event_time_offset", offsets);
        set_units(&ds, layout.offset_units);
        if layout.pulse_times {
            write_dataset(&data, "event_time_zero", &[1_000_000_000_i64, 3_500_000_000]);
        }
        if layout.proton_current {
            let current = experiment.create_group("proton_current").unwrap();
            if layout.proton_current_as_group {
                current.create_group("value").unwrap();
            } else {
                write_dataset(&current, "value", &[1.0_f64, 2.0, 1.0]);
            }
        }

        let stages = file
            .create_group("instrument")
            .unwrap()
            .create_group("stages")
            .unwrap();
        let com = stages.create_group("com").unwrap();
        set_units(&write_dataset(&com, "value", &[-1.5_f64]), "deg");
        let som = stages.create_group("som").unwrap();
        write_dataset(&som, "value", &[0.75_f64]);
        tmp
    }

    #[test]
    fn test_read_amor_file() {
        let tmp = write_amor_file(&Layout::default());
        let raw = read_amor_hdf5(tmp.path()).unwrap();

        assert_eq!(raw.title, "Ni 1000 A");
        assert_eq!(raw.events.pixel_id(), &[10, 1064, 2348]);
        assert_relative_eq!(raw.events.time_offset_s()[1], 0.03);
        assert_relative_eq!(raw.detector_horizon_reading.get::<degree>(), -1.5, max_relative = 1e-12);
        assert_relative_eq!(raw.sample_horizon_reading.get::<degree>(), 0.75, max_relative = 1e-12);
        assert_eq!(raw.proton_current.as_deref(), Some(&[1.0, 2.0, 1.0][..]));
        assert_eq!(raw.pulse_times_ns.as_deref(), Some(&[1_000_000_000, 3_500_000_000][..]));
    }

    #[test]
    fn test_open_event_reader_uses_proton_current() {
        let tmp = write_amor_file(&Layout::default());
        let reader =
            open_event_reader(tmp.path(), InstrumentGeometry::amor_defaults(), true).unwrap();
        assert_eq!(reader.summary().n_events, 3);
        assert_eq!(reader.summary().monitor_source, MonitorSource::ProtonCurrent);
        assert_relative_eq!(reader.summary().monitor, 4.0 * 0.075, max_relative = 1e-12);
        assert_relative_eq!(reader.horizons().detector.get::<degree>(), 1.5, max_relative = 1e-12);
    }

    #[test]
    fn test_monitor_fallback_to_pulse_duration() {
        let tmp = write_amor_file(&Layout {
            proton_current: false,
            ..Layout::default()
        });
        let reader =
            open_event_reader(tmp.path(), InstrumentGeometry::amor_defaults(), true).unwrap();
        assert!(reader.summary().monitor_fallback_used());
        assert_relative_eq!(reader.summary().monitor, 2.5);
    }

    #[test]
    fn test_unreadable_proton_current_is_an_error() {
        let tmp = write_amor_file(&Layout {
            proton_current_as_group: true,
            ..Layout::default()
        });
        let err = read_amor_hdf5(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::Hdf5(_)), "{err}");
    }

    #[test]
    fn test_link_exists_walks_parents() {
        let tmp = write_amor_file(&Layout {
            proton_current: false,
            ..Layout::default()
        });
        let file = File::open(tmp.path()).unwrap();
        assert!(link_exists(&file, paths::EVENT_ID));
        assert!(!link_exists(&file, paths::PROTON_CURRENT));
        assert!(!link_exists(&file, "/"));
        assert!(optional_dataset(&file, paths::PROTON_CURRENT).unwrap().is_none());
    }

    #[test]
    fn test_missing_monitor_sources() {
        let tmp = write_amor_file(&Layout {
            proton_current: false,
            pulse_times: false,
            ..Layout::default()
        });
        let err = open_event_reader(tmp.path(), InstrumentGeometry::amor_defaults(), true).unwrap_err();
        assert!(
            matches!(err, Error::CoreError(reflred_core::Error::MissingField(ref p)) if p == paths::EVENT_TIME_ZERO),
            "{err}"
        );
    }

    #[test]
    fn test_wrong_time_units() {
        let tmp = write_amor_file(&Layout {
            offset_units: "deg",
            ..Layout::default()
        });
        let err = read_amor_hdf5(tmp.path()).unwrap_err();
        assert!(
            matches!(err, Error::CoreError(reflred_core::Error::UnitMismatch { .. })),
            "{err}"
        );
    }

    #[test]
    fn test_event_column_length_mismatch() {
        let tmp = write_amor_file(&Layout {
            short_offsets: true,
            ..Layout::default()
        });
        let err = read_amor_hdf5(tmp.path()).unwrap_err();
        assert!(
            matches!(err, Error::CoreError(reflred_core::Error::LengthMismatch { .. })),
            "{err}"
        );
    }

    #[test]
    fn test_missing_required_field() {
        let tmp = NamedTempFile::new().unwrap();
        File::create(tmp.path()).unwrap();
        let err = read_amor_hdf5(tmp.path()).unwrap_err();
        assert!(
            matches!(err, Error::CoreError(reflred_core::Error::MissingField(ref p)) if p == paths::TITLE),
            "{err}"
        );
    }
}
