//! Run-level summaries and the interface a reduction consumes.

use crate::event::EventTable;
use uom::si::f64::Length;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the integrated monitor of a run was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MonitorSource {
    /// Summed incident proton current scaled by the chopper half-period.
    ProtonCurrent,
    /// Wall-clock span of the pulse timestamps, in seconds.
    ///
    /// Used when the proton current trace is absent from the file.
    PulseDuration,
}

/// Totals of one run, fixed at load.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunSummary {
    /// Number of detected events.
    pub n_events: usize,
    /// Integrated monitor used to normalise the run.
    pub monitor: f64,
    pub monitor_source: MonitorSource,
}

impl RunSummary {
    /// True if the monitor came from the pulse-duration fallback.
    #[must_use]
    pub fn monitor_fallback_used(&self) -> bool {
        self.monitor_source == MonitorSource::PulseDuration
    }
}

/// Beam and sample extent used by the footprint correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    /// Beam width perpendicular to the sample surface.
    pub beam_size: Length,
    /// Sample length along the beam.
    pub sample_size: Length,
}

/// A loaded and reconstructed measurement run.
///
/// This is the whole contract between event reconstruction and reduction:
/// a reducer reads the event table, the run totals and the footprint, and
/// never needs to know which instrument produced them.
pub trait ReflectometryRun {
    /// Reconstructed events with their masks.
    fn events(&self) -> &EventTable;

    /// Event and monitor totals.
    fn summary(&self) -> &RunSummary;

    /// Beam and sample size for the illumination correction.
    fn footprint(&self) -> Footprint;

    /// Human-readable run title.
    fn title(&self) -> &str {
        ""
    }
}
