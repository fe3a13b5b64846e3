//! reflred-io: File I/O for reflectometry reduction.
//!
//! This crate reads AMOR raw event files via HDF5 (feature `hdf5`) and
//! writes reduced reflectivity curves as ORSO-style text with a JSON
//! metadata header.
//!

mod error;
#[cfg(feature = "hdf5")]
pub mod hdf5;
pub mod orso;

pub use error::{Error, Result};
#[cfg(feature = "hdf5")]
pub use hdf5::{open_event_reader, read_amor_hdf5};
pub use orso::{
    Creation, DataSource, Experiment, InputFile, InputFiles, Measurement, Origin, OrsoFileWriter,
    OrsoHeader, Person, ReductionInfo, Sample,
};
