//! AMOR event reader: one run, fully reconstructed.

use crate::geometry::{AcceptanceBounds, InstrumentGeometry};
use crate::kinematics::{
    detector_reconstruction, find_qz, find_theta, fold_time_of_flight, tof_to_lambda,
    HorizonAngles,
};
use crate::mask::apply_masks;
use log::{debug, info, warn};
use reflred_core::{
    Angle, Error, EventMasks, EventTable, Footprint, MonitorSource, RawEventBatch,
    ReflectometryRun, Result, RunSummary, Time,
};
use uom::si::angle::degree;
use uom::si::time::second;

/// Location of the pulse timestamps used by the monitor fallback.
pub const PULSE_TIMES_PATH: &str = "/experiment/data/event_time_zero";

/// Everything read from one raw AMOR file, before reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct AmorRawRun {
    pub title: String,
    pub events: RawEventBatch,
    /// `com` motor reading, as stored.
    pub detector_horizon_reading: Angle,
    /// `som` motor reading, as stored.
    pub sample_horizon_reading: Angle,
    /// Incident proton current trace, if recorded.
    pub proton_current: Option<Vec<f64>>,
    /// Pulse timestamps in nanoseconds, if recorded.
    pub pulse_times_ns: Option<Vec<i64>>,
}

/// Integrated monitor of a run.
///
/// Prefers the proton current summed and scaled by `tau`; without it, falls
/// back to the span of the pulse timestamps in seconds. An empty current
/// trace counts as absent.
///
/// # Errors
/// Returns `MissingField` if neither source is available.
#[allow(clippy::cast_precision_loss)]
pub fn integrated_monitor(
    proton_current: Option<&[f64]>,
    pulse_times_ns: Option<&[i64]>,
    tau: Time,
) -> Result<(f64, MonitorSource)> {
    if let Some(current) = proton_current.filter(|c| !c.is_empty()) {
        let total: f64 = current.iter().sum();
        return Ok((total * tau.get::<second>(), MonitorSource::ProtonCurrent));
    }

    match pulse_times_ns {
        Some([first, .., last]) => Ok((
            (last - first) as f64 / 1e9,
            MonitorSource::PulseDuration,
        )),
        Some([_]) => Ok((0.0, MonitorSource::PulseDuration)),
        _ => Err(Error::MissingField(PULSE_TIMES_PATH.to_string())),
    }
}

/// A reconstructed AMOR run.
///
/// Construction runs the whole pipeline once; afterwards only the masks can
/// change, via [`EventReader::apply_masks`]. The raw batch is kept alongside
/// the reconstructed table. `Clone` gives an independent deep copy.
#[derive(Debug, Clone, PartialEq)]
pub struct EventReader {
    title: String,
    geometry: InstrumentGeometry,
    horizons: HorizonAngles,
    summary: RunSummary,
    raw: RawEventBatch,
    events: EventTable,
    masks_applied: bool,
}

impl EventReader {
    /// Reconstructs a raw run.
    ///
    /// With `mask_data = false` every event starts accepted.
    ///
    /// # Errors
    /// Returns `ConfigError` for an invalid geometry and `MissingField` when
    /// no monitor can be derived.
    pub fn from_raw(raw: AmorRawRun, geometry: InstrumentGeometry, mask_data: bool) -> Result<Self> {
        geometry.validate()?;

        let tau = geometry.tau();
        let (monitor, monitor_source) = integrated_monitor(
            raw.proton_current.as_deref(),
            raw.pulse_times_ns.as_deref(),
            tau,
        )?;
        if monitor_source == MonitorSource::PulseDuration {
            warn!(
                "{}: proton current missing, using pulse duration {monitor:.3} s as monitor",
                raw.title
            );
        }

        let horizons = HorizonAngles {
            detector: -raw.detector_horizon_reading,
            sample: raw.sample_horizon_reading + geometry.sample_angle_horizon_offset,
        };

        let tof_s = fold_time_of_flight(
            raw.events.time_offset_s(),
            tau,
            geometry.tof_cut(),
            geometry.tof_offset(),
        );
        let positions = detector_reconstruction(
            raw.events.pixel_id(),
            geometry.detector_blade_pitch,
            geometry.detector_angle,
        );
        let wavelengths = tof_to_lambda(&tof_s, &positions, &geometry, &horizons);
        let theta_deg = find_theta(&positions, &wavelengths, &geometry, &horizons, geometry.gravity);
        let qz = find_qz(&theta_deg, &wavelengths.wavelength_m);

        let n_events = raw.events.len();
        let masks = if mask_data {
            apply_masks(
                &positions.y_m,
                &wavelengths.wavelength_m,
                &theta_deg,
                &geometry.bounds,
                geometry.lambda_max(&geometry.bounds),
            )
        } else {
            EventMasks::cleared(n_events)
        };

        let events = EventTable {
            weight: vec![1.0; n_events],
            variance: vec![1.0; n_events],
            tof_s,
            blade: positions.blade,
            z_on_blade: positions.z_on_blade,
            y_index: positions.y_index,
            y_m: positions.y_m,
            z_m: positions.z_m,
            flight_path_m: wavelengths.flight_path_m,
            wavelength_m: wavelengths.wavelength_m,
            theta_deg,
            qz,
            masks,
        };
        events.validate()?;

        info!(
            "{}: {n_events} events, monitor {monitor:.4} ({monitor_source:?}), {} masked",
            raw.title,
            events.masks.masked_count()
        );
        debug!(
            "horizons: detector {:.4} deg, sample {:.4} deg",
            horizons.detector.get::<degree>(),
            horizons.sample.get::<degree>()
        );

        Ok(Self {
            title: raw.title,
            geometry,
            horizons,
            summary: RunSummary {
                n_events,
                monitor,
                monitor_source,
            },
            raw: raw.events,
            events,
            masks_applied: mask_data,
        })
    }

    /// Recomputes the masks against new bounds; no other column changes.
    pub fn apply_masks(&mut self, bounds: &AcceptanceBounds) {
        self.events.masks = apply_masks(
            &self.events.y_m,
            &self.events.wavelength_m,
            &self.events.theta_deg,
            bounds,
            self.geometry.lambda_max(bounds),
        );
        self.geometry.bounds = *bounds;
        self.masks_applied = true;
        debug!(
            "{}: re-masked, {} of {} events rejected",
            self.title,
            self.events.masks.masked_count(),
            self.events.len()
        );
    }

    /// Drops every mask so all events are accepted.
    pub fn clear_masks(&mut self) {
        self.events.masks = EventMasks::cleared(self.events.len());
        self.masks_applied = false;
    }

    /// Independent deep copy of this run.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Geometry the run was reconstructed with.
    ///
    /// `bounds` holds the last configured or applied bounds, whether or not
    /// they are in effect; see [`EventReader::active_bounds`].
    #[must_use]
    pub fn geometry(&self) -> &InstrumentGeometry {
        &self.geometry
    }

    /// Bounds the current masks were computed from, `None` while every
    /// event is accepted.
    #[must_use]
    pub fn active_bounds(&self) -> Option<&AcceptanceBounds> {
        self.masks_applied.then_some(&self.geometry.bounds)
    }

    /// Raw detector events the run was reconstructed from.
    #[must_use]
    pub fn raw_events(&self) -> &RawEventBatch {
        &self.raw
    }

    #[must_use]
    pub fn horizons(&self) -> &HorizonAngles {
        &self.horizons
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn events(&self) -> &EventTable {
        &self.events
    }

    #[must_use]
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }
}

impl ReflectometryRun for EventReader {
    fn events(&self) -> &EventTable {
        &self.events
    }

    fn summary(&self) -> &RunSummary {
        &self.summary
    }

    fn footprint(&self) -> Footprint {
        self.geometry.footprint()
    }

    fn title(&self) -> &str {
        &self.title
    }
}
