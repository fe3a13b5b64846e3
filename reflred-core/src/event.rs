//! Structure of Arrays (`SoA`) event storage.
//!
//! [`RawEventBatch`] holds what comes off the detector for one run.
//! [`EventTable`] holds the reconstructed per-event quantities in parallel
//! columns; each column name carries its unit.

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Raw detector hits of one run.
///
/// Immutable once built: the reader that loaded it owns it and only derives
/// new columns from it.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawEventBatch {
    pixel_id: Vec<u32>,
    time_offset_s: Vec<f64>,
}

impl RawEventBatch {
    /// Builds a batch from pixel ids and time offsets already in seconds.
    ///
    /// # Errors
    /// Returns `LengthMismatch` if the two columns differ in length.
    pub fn new(pixel_id: Vec<u32>, time_offset_s: Vec<f64>) -> Result<Self> {
        if pixel_id.len() != time_offset_s.len() {
            return Err(Error::LengthMismatch {
                what: "event_time_offset",
                expected: pixel_id.len(),
                found: time_offset_s.len(),
            });
        }
        Ok(Self {
            pixel_id,
            time_offset_s,
        })
    }

    /// Builds a batch from time offsets in nanoseconds, as stored on disk.
    ///
    /// # Errors
    /// Returns `LengthMismatch` if the two columns differ in length.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_nanoseconds(pixel_id: Vec<u32>, time_offset_ns: &[i64]) -> Result<Self> {
        let time_offset_s = time_offset_ns.iter().map(|&ns| ns as f64 / 1e9).collect();
        Self::new(pixel_id, time_offset_s)
    }

    /// Detector pixel identifiers.
    #[must_use]
    pub fn pixel_id(&self) -> &[u32] {
        &self.pixel_id
    }

    /// Time of flight relative to the pulse, in seconds.
    #[must_use]
    pub fn time_offset_s(&self) -> &[f64] {
        &self.time_offset_s
    }

    /// Returns the number of events in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pixel_id.len()
    }

    /// Returns true if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixel_id.is_empty()
    }
}

/// Acceptance masks. `true` means the event is rejected.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventMasks {
    /// Detector y-position outside the accepted range.
    pub y: Vec<bool>,
    /// Wavelength outside the accepted band.
    pub wavelength: Vec<bool>,
    /// Reflection angle outside the accepted range.
    pub theta: Vec<bool>,
}

impl EventMasks {
    /// All events accepted.
    #[must_use]
    pub fn cleared(len: usize) -> Self {
        Self {
            y: vec![false; len],
            wavelength: vec![false; len],
            theta: vec![false; len],
        }
    }

    /// True if any of the masks rejects event `idx`.
    #[inline]
    #[must_use]
    pub fn is_masked(&self, idx: usize) -> bool {
        self.y[idx] || self.wavelength[idx] || self.theta[idx]
    }

    /// Number of rejected events.
    #[must_use]
    pub fn masked_count(&self) -> usize {
        (0..self.y.len()).filter(|&i| self.is_masked(i)).count()
    }
}

/// One reconstructed event, read out of an [`EventTable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconstructedEvent {
    pub weight: f64,
    pub variance: f64,
    pub tof_s: f64,
    pub blade: u32,
    pub z_on_blade: u32,
    pub y_index: u32,
    pub y_m: f64,
    pub z_m: f64,
    pub flight_path_m: f64,
    pub wavelength_m: f64,
    pub theta_deg: f64,
    /// Momentum transfer in 1/angstrom.
    pub qz: f64,
    pub masked: bool,
}

/// Reconstructed events of one run in `SoA` layout.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventTable {
    /// Statistical weight, 1.0 at load.
    pub weight: Vec<f64>,
    /// Variance of the weight, 1.0 at load.
    pub variance: Vec<f64>,
    /// Folded time of flight.
    pub tof_s: Vec<f64>,
    pub blade: Vec<u32>,
    pub z_on_blade: Vec<u32>,
    /// Pixel column across the blade.
    pub y_index: Vec<u32>,
    pub y_m: Vec<f64>,
    pub z_m: Vec<f64>,
    pub flight_path_m: Vec<f64>,
    pub wavelength_m: Vec<f64>,
    pub theta_deg: Vec<f64>,
    /// Momentum transfer in 1/angstrom.
    pub qz: Vec<f64>,
    pub masks: EventMasks,
}

impl EventTable {
    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weight.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weight.is_empty()
    }

    /// Checks that every column has the same length.
    ///
    /// # Errors
    /// Returns `LengthMismatch` naming the first column that disagrees.
    pub fn validate(&self) -> Result<()> {
        let expected = self.len();
        let columns: [(&'static str, usize); 15] = [
            ("variance", self.variance.len()),
            ("tof", self.tof_s.len()),
            ("blade", self.blade.len()),
            ("z_on_blade", self.z_on_blade.len()),
            ("y_index", self.y_index.len()),
            ("y", self.y_m.len()),
            ("z", self.z_m.len()),
            ("flight_path", self.flight_path_m.len()),
            ("wavelength", self.wavelength_m.len()),
            ("theta", self.theta_deg.len()),
            ("qz", self.qz.len()),
            ("mask_y", self.masks.y.len()),
            ("mask_wavelength", self.masks.wavelength.len()),
            ("mask_theta", self.masks.theta.len()),
            ("weight", self.weight.len()),
        ];
        for (what, found) in columns {
            if found != expected {
                return Err(Error::LengthMismatch {
                    what,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    /// Reads event `idx` as a record.
    ///
    /// # Panics
    /// Panics if `idx` is out of bounds.
    #[must_use]
    pub fn event(&self, idx: usize) -> ReconstructedEvent {
        ReconstructedEvent {
            weight: self.weight[idx],
            variance: self.variance[idx],
            tof_s: self.tof_s[idx],
            blade: self.blade[idx],
            z_on_blade: self.z_on_blade[idx],
            y_index: self.y_index[idx],
            y_m: self.y_m[idx],
            z_m: self.z_m[idx],
            flight_path_m: self.flight_path_m[idx],
            wavelength_m: self.wavelength_m[idx],
            theta_deg: self.theta_deg[idx],
            qz: self.qz[idx],
            masked: self.masks.is_masked(idx),
        }
    }

    /// Iterates over all events as records.
    pub fn iter(&self) -> impl Iterator<Item = ReconstructedEvent> + '_ {
        (0..self.len()).map(|idx| self.event(idx))
    }

    /// Minimum and maximum of `column` over accepted events.
    ///
    /// Returns `None` if no event is accepted or `column` is not a column of
    /// this table's length.
    #[must_use]
    pub fn accepted_range(&self, column: &[f64]) -> Option<(f64, f64)> {
        if column.len() != self.len() {
            return None;
        }
        column
            .iter()
            .enumerate()
            .filter(|&(idx, v)| !self.masks.is_masked(idx) && v.is_finite())
            .fold(None, |range, (_, &v)| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            })
    }

    /// Mutable access to the weights, for in-place normalisation.
    pub fn weights_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        (&mut self.weight, &mut self.variance)
    }

    /// Divides every weight by `divisor`, scaling variances by its square.
    pub fn scale_weights(&mut self, divisor: f64) {
        let divisor_sq = divisor * divisor;
        for (w, v) in self.weight.iter_mut().zip(self.variance.iter_mut()) {
            *w /= divisor;
            *v /= divisor_sq;
        }
    }

    /// Divides weight `i` by `divisors[i]`, scaling variances by its square.
    ///
    /// # Errors
    /// Returns `LengthMismatch` if `divisors` does not cover every event.
    pub fn scale_weights_by(&mut self, divisors: &[f64]) -> Result<()> {
        if divisors.len() != self.len() {
            return Err(Error::LengthMismatch {
                what: "weight divisors",
                expected: self.len(),
                found: divisors.len(),
            });
        }
        for ((w, v), &d) in self
            .weight
            .iter_mut()
            .zip(self.variance.iter_mut())
            .zip(divisors)
        {
            *w /= d;
            *v /= d * d;
        }
        Ok(())
    }
}
