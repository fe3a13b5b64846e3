//! reflred-algorithms: Reduction algorithms for reflectometry runs.
//!
//! This crate turns reconstructed runs into reflectivity:
//! - **Illumination** - Gaussian-beam footprint correction per event
//! - **Binning** - weighted histogramming in momentum transfer
//! - **Supermirror** - linear calibration of the reference
//! - **Reduction** - reference/sample normalisation and division
//!
//! Everything here works through [`ReflectometryRun`], so any reader that
//! produces an event table can be reduced.
//!
#![warn(missing_docs)]

pub mod binning;
pub mod illumination;
pub mod reduction;
pub mod supermirror;

pub use binning::{histogram_events, linear_edges, log_edges};
pub use illumination::{illumination_correction, illumination_factors};
pub use reduction::{normalise_events, reduce, Reduction, ReductionTotals, ReflectivityReducer};
pub use supermirror::SupermirrorCalibration;

// Re-export the run contract for convenience
pub use reflred_core::ReflectometryRun;
