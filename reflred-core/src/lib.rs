//! reflred-core: Core types for neutron reflectometry reduction.
//!
//! This crate provides the event table shared by reconstruction and
//! reduction, unit-checked quantities, physical constants, histograms and
//! the reflectivity curve.
//!

pub mod constants;
pub mod error;
pub mod event;
pub mod histogram;
pub mod run;
pub mod units;

pub use error::{Error, Result};
pub use event::{EventMasks, EventTable, RawEventBatch, ReconstructedEvent};
pub use histogram::{DegenerateBin, Histogram1D, ReflectivityCurve};
pub use run::{Footprint, MonitorSource, ReflectometryRun, RunSummary};

// Re-export the quantity types used across the public API
pub use uom::si::f64::{Angle, DiffusionCoefficient, Frequency, Length, Time};
