#![allow(clippy::unreadable_literal)]
use reflred_algorithms::reduce;
use reflred_amor::{AmorRawRun, EventReader, InstrumentGeometry};
use reflred_core::{Angle, RawEventBatch};
use reflred_io::{
    Creation, DataSource, Experiment, InputFile, InputFiles, Measurement, Origin, OrsoFileWriter,
    OrsoHeader, Person, ReductionInfo, Sample,
};
use tempfile::NamedTempFile;
use uom::si::angle::degree;

fn reader(proton_current: f64) -> EventReader {
    let pixel_id: Vec<u32> = (0..4 * 1024).step_by(97).collect();
    let time_offset_s: Vec<f64> = (0..pixel_id.len())
        .map(|i| 0.015 + 0.0011 * f64::from(u32::try_from(i).unwrap()))
        .collect();
    let raw = AmorRawRun {
        title: "Ni/Ti multilayer".to_string(),
        events: RawEventBatch::new(pixel_id, time_offset_s).unwrap(),
        detector_horizon_reading: Angle::new::<degree>(-1.6),
        sample_horizon_reading: Angle::new::<degree>(0.8),
        proton_current: Some(vec![proton_current]),
        pulse_times_ns: None,
    };
    EventReader::from_raw(raw, InstrumentGeometry::amor_defaults(), true).unwrap()
}

#[test]
fn test_reduced_file_layout() {
    let reference = reader(4.0);
    let sample = reader(2.0);
    let edges = vec![0.005, 0.01, 0.02, 0.04, 0.08];
    let reduction = reduce(&reference, &sample, &edges).unwrap();

    let owner = Person::new("Reflectometry Team");
    let header = OrsoHeader::new(
        Creation::now(owner.clone()),
        DataSource {
            origin: Origin::new(owner, sample.title()),
            experiment: Experiment::amor(
                Sample::new(sample.title()),
                Measurement::from_events(sample.events()),
            ),
        },
        ReductionInfo::new(
            InputFiles {
                reference: InputFile::new("amor2023n000611.hdf", None),
                sample: InputFile::new("amor2023n000612.hdf", Some("2023-06-12T14:02:11".to_string())),
            },
            &reduction,
            true,
        ),
    );

    let file = NamedTempFile::new().unwrap();
    OrsoFileWriter::create(file.path())
        .unwrap()
        .write(&header, &reduction.reflectivity)
        .unwrap();
    let content = std::fs::read_to_string(file.path()).unwrap();

    let json: String = content
        .lines()
        .skip(1)
        .take_while(|l| *l != "# Qz R sR")
        .map(|l| &l[2..])
        .collect::<Vec<_>>()
        .join("\n");
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["data_source"]["origin"]["title"], "Ni/Ti multilayer");
    assert_eq!(parsed["reduction"]["totals"]["sample_counts"], sample.events().len());
    assert_eq!(parsed["columns"][0]["unit"], "1/angstrom");
    assert_eq!(parsed["data_source"]["experiment"]["sample"]["name"], "Ni/Ti multilayer");
    assert_eq!(
        parsed["reduction"]["input_files"]["sample"]["creation_time"],
        "2023-06-12T14:02:11"
    );
    assert!(parsed["reduction"]["input_files"]["reference"]
        .get("creation_time")
        .is_none());

    let rows: Vec<Vec<&str>> = content
        .lines()
        .filter(|l| !l.starts_with('#'))
        .map(|l| l.split_whitespace().collect())
        .collect();
    assert_eq!(rows.len(), 4);
    for (row, center) in rows.iter().zip(reduction.reflectivity.q_centers()) {
        assert_eq!(row.len(), 3);
        let q: f64 = row[0].parse().unwrap();
        assert!((q - center).abs() < 1e-6 * center);
    }
}
