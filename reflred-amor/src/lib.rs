//! reflred-amor: Event reader for the AMOR reflectometer.
//!
//! Turns one raw AMOR run into a fully reconstructed [`EventTable`]:
//!
//! - [`InstrumentGeometry`] - chopper, distances, detector layout and
//!   acceptance bounds, with physical defaults and JSON loading
//! - [`PixelAddress`] - blade/z/y decomposition of detector pixel ids
//! - [`kinematics`] - time-of-flight folding, positions, wavelength, angle, Q
//! - [`mask`] - non-destructive acceptance masks
//! - [`EventReader`] - the pipeline, run once per raw run
//!
//! [`EventTable`]: reflred_core::EventTable

pub mod geometry;
pub mod kinematics;
pub mod mask;
pub mod pixel;
pub mod reader;

pub use geometry::{AcceptanceBounds, InstrumentGeometry};
pub use kinematics::{DetectorPositions, HorizonAngles, Wavelengths};
pub use pixel::PixelAddress;
pub use reader::{integrated_monitor, AmorRawRun, EventReader};
