//! Error types for reflred-core.

use thiserror::Error;

/// Result type alias for reflred operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for reflectometry reduction.
#[derive(Error, Debug)]
pub enum Error {
    /// A required field of the raw data is absent.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A value carried a unit of the wrong physical dimension.
    #[error("unit mismatch for {quantity}: expected {expected}, found '{found}'")]
    UnitMismatch {
        quantity: String,
        expected: &'static str,
        found: String,
    },

    /// Histogram bin edges are unusable.
    #[error("invalid bin edges: {0}")]
    InvalidBinEdges(String),

    /// Parallel event columns disagree in length.
    #[error("length mismatch for {what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Shorthand for a unit mismatch on a named quantity.
    pub fn unit_mismatch(quantity: &str, expected: &'static str, found: &str) -> Self {
        Self::UnitMismatch {
            quantity: quantity.to_string(),
            expected,
            found: found.to_string(),
        }
    }
}
