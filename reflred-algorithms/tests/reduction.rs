#![allow(clippy::cast_precision_loss, clippy::unreadable_literal)]
use approx::assert_relative_eq;
use reflred_algorithms::{reduce, ReflectivityReducer, SupermirrorCalibration};
use reflred_amor::{AmorRawRun, EventReader, InstrumentGeometry};
use reflred_core::{Angle, Length, RawEventBatch};
use statrs::function::erf::erf;
use std::f64::consts::PI;
use uom::si::angle::degree;
use uom::si::length::millimeter;

// Upper blades only, so every angle stays positive with a 1 deg sample horizon
const PIXELS: [u32; 4] = [
    3 * 32 + 10,
    1024 + 7 * 32 + 12,
    2 * 1024 + 32 + 20,
    3 * 1024 + 20 * 32 + 5,
];
const TIMES_S: [f64; 4] = [0.011, 0.023, 0.037, 0.052];

fn raw_run(proton_current: Vec<f64>) -> AmorRawRun {
    AmorRawRun {
        title: "four events".to_string(),
        events: RawEventBatch::new(PIXELS.to_vec(), TIMES_S.to_vec()).unwrap(),
        detector_horizon_reading: Angle::new::<degree>(-2.0),
        sample_horizon_reading: Angle::new::<degree>(1.0),
        proton_current: Some(proton_current),
        pulse_times_ns: None,
    }
}

fn expected_intensity(
    reader: &EventReader,
    edges: &[f64],
    sample_size_m: f64,
    beam_size_m: f64,
) -> Vec<f64> {
    let events = reader.events();
    let monitor = reader.summary().monitor;
    let mut bins = vec![0.0; edges.len() - 1];
    for idx in 0..events.len() {
        let theta = events.theta_deg[idx];
        let footprint = erf(sample_size_m / beam_size_m * theta * PI / 180.0 * 2.35482);
        let q = events.qz[idx];
        for bin in 0..bins.len() {
            if q >= edges[bin] && q < edges[bin + 1] {
                bins[bin] += 1.0 / monitor / footprint;
            }
        }
    }
    bins
}

fn split_edges(qz: &[f64]) -> Vec<f64> {
    let mut sorted = qz.to_vec();
    sorted.sort_by(f64::total_cmp);
    vec![
        sorted[0] * 0.9,
        0.5 * (sorted[1] + sorted[2]),
        sorted[3] * 1.1,
    ]
}

#[test]
fn test_four_event_reduction_matches_hand_calculation() {
    let geometry = InstrumentGeometry::amor_defaults();
    let sample_geometry = geometry
        .clone()
        .with_footprint(Length::new::<millimeter>(1.0), Length::new::<millimeter>(4.0));

    let reference = EventReader::from_raw(raw_run(vec![3.0, 5.0]), geometry, false).unwrap();
    let sample = EventReader::from_raw(raw_run(vec![1.0, 1.5]), sample_geometry, false).unwrap();

    let edges = split_edges(&reference.events().qz);
    assert!(reference.events().qz.iter().all(|&q| q > 0.0));

    let reduction = reduce(&reference, &sample, &edges).unwrap();

    let reference_bins = expected_intensity(&reference, &edges, 0.010, 0.001);
    let sample_bins = expected_intensity(&sample, &edges, 0.004, 0.001);
    let calibration = SupermirrorCalibration::default();
    for bin in 0..2 {
        let center = 0.5 * (edges[bin] + edges[bin + 1]);
        let supermirror = -2.5510204081632653 * center + 1.028061224489796;
        assert_relative_eq!(supermirror, calibration.reflectivity(center), max_relative = 1e-12);

        let reference_value = reference_bins[bin] / supermirror;
        assert_relative_eq!(
            reduction.reference_intensity.values[bin],
            reference_value,
            max_relative = 1e-9
        );
        assert_relative_eq!(
            reduction.sample_intensity.values[bin],
            sample_bins[bin],
            max_relative = 1e-9
        );
        assert_relative_eq!(
            reduction.reflectivity.reflectivity[bin],
            sample_bins[bin] / reference_value,
            max_relative = 1e-9
        );
    }

    assert_eq!(reduction.totals.reference_counts, 4);
    assert_eq!(reduction.totals.sample_counts, 4);
    assert_relative_eq!(reduction.totals.reference_monitor, 8.0 * 0.075, max_relative = 1e-12);
    assert_relative_eq!(reduction.totals.sample_monitor, 2.5 * 0.075, max_relative = 1e-12);
}

#[test]
fn test_masked_events_do_not_contribute() {
    let geometry = InstrumentGeometry::amor_defaults();
    let reference = EventReader::from_raw(raw_run(vec![1.0]), geometry.clone(), false).unwrap();
    let edges = split_edges(&reference.events().qz);

    let unmasked = reduce(&reference, &reference, &edges).unwrap();
    let mut masked_reference = reference.copy();
    masked_reference.apply_masks(&reflred_amor::AcceptanceBounds {
        theta_max: Angle::new::<degree>(0.0),
        ..geometry.bounds
    });
    let masked = reduce(&masked_reference, &reference, &edges).unwrap();

    assert!(unmasked.reflectivity.reflectivity.iter().all(|r| r.is_finite()));
    assert!(masked.reflectivity.reflectivity.iter().all(|r| r.is_nan()));
    assert_eq!(masked.reflectivity.degenerate_bins().len(), 2);
}

#[test]
fn test_reducer_is_reusable() {
    let geometry = InstrumentGeometry::amor_defaults();
    let reference = EventReader::from_raw(raw_run(vec![2.0]), geometry.clone(), false).unwrap();
    let sample = EventReader::from_raw(raw_run(vec![1.0]), geometry, false).unwrap();
    let reducer = ReflectivityReducer::new(split_edges(&reference.events().qz)).unwrap();

    let first = reducer.reduce(&reference, &sample).unwrap();
    let second = reducer.reduce(&reference, &sample).unwrap();
    assert_eq!(first.reflectivity, second.reflectivity);
    assert_eq!(reference.events().weight, vec![1.0; 4]);
}
