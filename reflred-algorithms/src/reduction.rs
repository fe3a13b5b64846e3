//! Reference/sample normalisation into a reflectivity curve.

use crate::binning::histogram_events;
use crate::illumination::illumination_factors;
use crate::supermirror::SupermirrorCalibration;
use log::{debug, warn};
use reflred_core::histogram::validate_edges;
use reflred_core::{EventTable, Histogram1D, ReflectivityCurve, ReflectometryRun, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Event and monitor totals of both runs of a reduction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReductionTotals {
    /// Events in the reference run.
    pub reference_counts: usize,
    /// Integrated monitor of the reference run.
    pub reference_monitor: f64,
    /// Events in the sample run.
    pub sample_counts: usize,
    /// Integrated monitor of the sample run.
    pub sample_monitor: f64,
}

/// Result of reducing one sample run against one reference run.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    /// Reference intensity after monitor, footprint and supermirror correction.
    pub reference_intensity: Histogram1D,
    /// Sample intensity after monitor and footprint correction.
    pub sample_intensity: Histogram1D,
    /// `sample_intensity / reference_intensity`.
    pub reflectivity: ReflectivityCurve,
    /// Totals for provenance.
    pub totals: ReductionTotals,
}

/// Normalises a copy of a run's events by monitor and illumination.
///
/// The run itself is left untouched.
///
/// # Errors
/// Returns `LengthMismatch` if the event table is inconsistent.
pub fn normalise_events<R: ReflectometryRun + ?Sized>(run: &R) -> Result<EventTable> {
    let mut events = run.events().clone();
    events.validate()?;

    let monitor = run.summary().monitor;
    if monitor.is_nan() || monitor <= 0.0 {
        warn!("{}: monitor is {monitor}, intensities will not be finite", run.title());
    }
    events.scale_weights(monitor);

    let factors = illumination_factors(&run.footprint(), &events.theta_deg);
    events.scale_weights_by(&factors)?;
    Ok(events)
}

/// Reduces sample runs against a reference on fixed momentum-transfer bins.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectivityReducer {
    q_bins: Vec<f64>,
    calibration: SupermirrorCalibration,
}

impl ReflectivityReducer {
    /// Creates a reducer on `q_bins` (1/angstrom) with the default supermirror.
    ///
    /// # Errors
    /// Returns `InvalidBinEdges` unless there are at least two finite,
    /// strictly increasing edges.
    pub fn new(q_bins: Vec<f64>) -> Result<Self> {
        validate_edges(&q_bins)?;
        Ok(Self {
            q_bins,
            calibration: SupermirrorCalibration::default(),
        })
    }

    /// Replaces the supermirror calibration.
    #[must_use]
    pub fn with_calibration(mut self, calibration: SupermirrorCalibration) -> Self {
        self.calibration = calibration;
        self
    }

    /// Momentum-transfer bin edges.
    #[must_use]
    pub fn q_bins(&self) -> &[f64] {
        &self.q_bins
    }

    /// Supermirror calibration applied to the reference.
    #[must_use]
    pub fn calibration(&self) -> &SupermirrorCalibration {
        &self.calibration
    }

    /// Histograms a normalised run without the supermirror correction.
    ///
    /// # Errors
    /// Returns `LengthMismatch` if the event table is inconsistent.
    pub fn intensity<R: ReflectometryRun + ?Sized>(&self, run: &R) -> Result<Histogram1D> {
        let events = normalise_events(run)?;
        histogram_events(&events, &self.q_bins)
    }

    /// Reduces `sample` against `reference`.
    ///
    /// Neither run is modified. Bins with zero reference intensity are NaN
    /// in the reflectivity and are logged.
    ///
    /// # Errors
    /// Returns `LengthMismatch` if either event table is inconsistent.
    pub fn reduce<R, S>(&self, reference: &R, sample: &S) -> Result<Reduction>
    where
        R: ReflectometryRun + ?Sized,
        S: ReflectometryRun + ?Sized,
    {
        let mut reference_intensity = self.intensity(reference)?;
        self.calibration.correct(&mut reference_intensity)?;
        let sample_intensity = self.intensity(sample)?;

        let reflectivity = ReflectivityCurve::ratio(&sample_intensity, &reference_intensity)?;
        let degenerate = reflectivity.degenerate_bins();
        if !degenerate.is_empty() {
            let first = degenerate[0];
            warn!(
                "{} of {} bins have no reference intensity (first at q = {:.5} 1/A); set to NaN",
                degenerate.len(),
                reflectivity.len(),
                first.q_center
            );
        }

        let reference_summary = reference.summary();
        let sample_summary = sample.summary();
        let totals = ReductionTotals {
            reference_counts: reference_summary.n_events,
            reference_monitor: reference_summary.monitor,
            sample_counts: sample_summary.n_events,
            sample_monitor: sample_summary.monitor,
        };
        debug!(
            "reduced '{}' against '{}' on {} bins",
            sample.title(),
            reference.title(),
            reflectivity.len()
        );

        Ok(Reduction {
            reference_intensity,
            sample_intensity,
            reflectivity,
            totals,
        })
    }
}

/// Reduces `sample` against `reference` on `q_bins` with the default supermirror.
///
/// # Errors
/// Returns `InvalidBinEdges` for unusable edges and `LengthMismatch` for an
/// inconsistent event table.
pub fn reduce<R, S>(reference: &R, sample: &S, q_bins: &[f64]) -> Result<Reduction>
where
    R: ReflectometryRun + ?Sized,
    S: ReflectometryRun + ?Sized,
{
    ReflectivityReducer::new(q_bins.to_vec())?.reduce(reference, sample)
}
