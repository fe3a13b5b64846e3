//! ORSO-style text output of a reduced reflectivity curve.
//!
//! The file starts with a JSON metadata header, every line prefixed with
//! `# `, followed by whitespace-separated `Qz R sR` columns at bin centres.

use crate::Result;
use chrono::{DateTime, Local};
use reflred_algorithms::{Reduction, ReductionTotals};
use reflred_core::{EventTable, ReflectivityCurve};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Time format used in headers.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const DEFAULT_AFFILIATION: &str = "European Spallation Source";
const DEFAULT_SYSTEM: &str = "dmsc.ess.eu";

/// A person and their affiliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub affiliation: String,
}

impl Person {
    /// A person at the default affiliation.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affiliation: DEFAULT_AFFILIATION.to_string(),
        }
    }

    /// Sets the affiliation.
    #[must_use]
    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = affiliation.into();
        self
    }
}

/// Who produced the reduced file, when and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creation {
    pub owner: Person,
    pub time: String,
    pub system: String,
}

impl Creation {
    /// Stamped with the current local time.
    #[must_use]
    pub fn now(owner: Person) -> Self {
        Self {
            owner,
            time: Local::now().format(TIME_FORMAT).to_string(),
            system: DEFAULT_SYSTEM.to_string(),
        }
    }
}

/// Where the raw data came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub owner: Person,
    pub title: String,
    pub facility: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
}

impl Origin {
    /// Raw data owned by `owner`, recorded at the default facility.
    #[must_use]
    pub fn new(owner: Person, title: impl Into<String>) -> Self {
        Self {
            owner,
            title: title.into(),
            facility: DEFAULT_AFFILIATION.to_string(),
            experiment_id: None,
        }
    }
}

/// Measurement scheme and the ranges actually covered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub scheme: String,
    /// Accepted wavelength range in angstrom.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wavelength_range: Option<[f64; 2]>,
    /// Accepted reflection-angle range in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_range: Option<[f64; 2]>,
}

impl Measurement {
    /// Time-of-flight measurement, with ranges taken from the accepted events.
    #[must_use]
    pub fn from_events(events: &EventTable) -> Self {
        Self {
            scheme: "angle- and energy-dispersive".to_string(),
            wavelength_range: events
                .accepted_range(&events.wavelength_m)
                .map(|(lo, hi)| [lo * 1e10, hi * 1e10]),
            angle_range: events
                .accepted_range(&events.theta_deg)
                .map(|(lo, hi)| [lo, hi]),
        }
    }
}

/// The measured sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Sample {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// Sets a free-text description, e.g. the layer stack.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Instrument, probe and sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub instrument: String,
    pub probe: String,
    pub sample: Sample,
    pub measurement: Measurement,
}

impl Experiment {
    /// A neutron measurement on AMOR.
    #[must_use]
    pub fn amor(sample: Sample, measurement: Measurement) -> Self {
        Self {
            instrument: "AMOR".to_string(),
            probe: "neutron".to_string(),
            sample,
            measurement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub origin: Origin,
    pub experiment: Experiment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Software {
    pub name: String,
    pub version: String,
}

impl Default for Software {
    fn default() -> Self {
        Self {
            name: "reflred".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// One raw file and when it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
}

impl InputFile {
    #[must_use]
    pub fn new(file: impl Into<String>, creation_time: Option<String>) -> Self {
        Self {
            file: file.into(),
            creation_time,
        }
    }

    /// Names `path`, stamped with its modification time when the filesystem
    /// reports one.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let creation_time = std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .map(|modified| DateTime::<Local>::from(modified).format(TIME_FORMAT).to_string());
        Self::new(path.display().to_string(), creation_time)
    }
}

/// Raw files that went into the reduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFiles {
    pub reference: InputFile,
    pub sample: InputFile,
}

/// How the data were reduced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionInfo {
    pub software: Software,
    pub input_files: InputFiles,
    /// Corrections applied, in order.
    pub corrections: Vec<String>,
    pub totals: ReductionTotals,
}

impl ReductionInfo {
    /// Describes a finished reduction of the given input files.
    #[must_use]
    pub fn new(input_files: InputFiles, reduction: &Reduction, gravity: bool) -> Self {
        let mut corrections = vec![
            "monitor normalisation".to_string(),
            "footprint (illumination) correction".to_string(),
            "supermirror calibration of the reference".to_string(),
        ];
        if gravity {
            corrections.push("gravity-corrected reflection angle".to_string());
        }
        Self {
            software: Software::default(),
            input_files,
            corrections,
            totals: reduction.totals,
        }
    }
}

/// A data column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub description: String,
}

impl Column {
    fn new(name: &str, unit: Option<&str>, description: &str) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.map(str::to_string),
            description: description.to_string(),
        }
    }
}

/// Columns written by [`OrsoFileWriter`].
#[must_use]
pub fn reflectivity_columns() -> Vec<Column> {
    vec![
        Column::new("Qz", Some("1/angstrom"), "momentum transfer at bin centre"),
        Column::new("R", None, "reflectivity"),
        Column::new("sR", None, "standard deviation of reflectivity"),
    ]
}

/// Full metadata header of a reduced file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrsoHeader {
    pub creation: Creation,
    pub data_source: DataSource,
    pub reduction: ReductionInfo,
    pub columns: Vec<Column>,
}

impl OrsoHeader {
    /// Builds a header with the standard reflectivity columns.
    #[must_use]
    pub fn new(creation: Creation, data_source: DataSource, reduction: ReductionInfo) -> Self {
        Self {
            creation,
            data_source,
            reduction,
            columns: reflectivity_columns(),
        }
    }

    /// Header as `# `-prefixed lines.
    ///
    /// # Errors
    /// Returns `Json` if serialisation fails.
    pub fn to_comment_lines(&self) -> Result<Vec<String>> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(json.lines().map(|line| format!("# {line}")).collect())
    }
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{value:.6e}")
    }
}

/// Writer for reduced reflectivity files.
pub struct OrsoFileWriter {
    writer: BufWriter<File>,
}

impl OrsoFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns `Io` if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes the header and one row per bin.
    ///
    /// # Errors
    /// Returns `Io` or `Json` on failure.
    pub fn write(&mut self, header: &OrsoHeader, curve: &ReflectivityCurve) -> Result<()> {
        writeln!(self.writer, "# reflectivity data file, JSON header")?;
        for line in header.to_comment_lines()? {
            writeln!(self.writer, "{line}")?;
        }
        let names: Vec<&str> = header.columns.iter().map(|c| c.name.as_str()).collect();
        writeln!(self.writer, "# {}", names.join(" "))?;

        for ((q, r), sr) in curve
            .q_centers()
            .into_iter()
            .zip(&curve.reflectivity)
            .zip(curve.uncertainty())
        {
            writeln!(
                self.writer,
                "{} {} {}",
                format_value(q),
                format_value(*r),
                format_value(sr)
            )?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns `Io` on failure.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
