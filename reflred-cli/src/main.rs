//! reflred CLI: reduce AMOR event files to reflectivity.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use clap::{Parser, Subcommand};
use log::info;
use reflred_algorithms::{linear_edges, log_edges, ReflectivityReducer};
use reflred_amor::{EventReader, InstrumentGeometry};
use reflred_io::{
    open_event_reader, Creation, DataSource, Experiment, InputFile, InputFiles, Measurement,
    Origin, OrsoFileWriter, OrsoHeader, Person, ReductionInfo, Sample,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use uom::si::angle::degree;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    ReflredIo(#[from] reflred_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] reflred_core::Error),
}

/// Event-mode reflectivity reduction for the AMOR reflectometer.
#[derive(Parser)]
#[command(name = "reflred")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce a sample run against a reference run
    Reduce {
        /// Reference (supermirror) raw file
        #[arg(long)]
        reference: PathBuf,

        /// Sample raw file
        #[arg(long)]
        sample: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Instrument configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Lower Q edge (1/angstrom)
        #[arg(long, default_value = "0.005")]
        q_min: f64,

        /// Upper Q edge (1/angstrom)
        #[arg(long, default_value = "0.08")]
        q_max: f64,

        /// Number of Q bins
        #[arg(long, default_value = "50")]
        bins: usize,

        /// Space Q bins logarithmically
        #[arg(long)]
        log_bins: bool,

        /// Disable the gravity correction of the reflection angle
        #[arg(long)]
        no_gravity: bool,

        /// Keep every event, ignoring the acceptance bounds
        #[arg(long)]
        no_mask: bool,

        /// Owner recorded in the output header
        #[arg(long)]
        owner: Option<String>,
    },

    /// Show information about a raw file
    Info {
        /// Input raw file
        input: PathBuf,

        /// Instrument configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_geometry(config: Option<&Path>) -> Result<InstrumentGeometry> {
    match config {
        Some(path) => Ok(InstrumentGeometry::from_file(path)?),
        None => Ok(InstrumentGeometry::amor_defaults()),
    }
}

fn default_owner() -> String {
    std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}

fn print_range(label: &str, range: Option<(f64, f64)>, unit: &str) {
    match range {
        Some((lo, hi)) => println!("{label}: {lo:.4} - {hi:.4} {unit}"),
        None => println!("{label}: no accepted events"),
    }
}

fn print_info(path: &Path, reader: &EventReader) {
    let events = reader.events();
    let summary = reader.summary();
    println!("File: {}", path.display());
    println!("Title: {}", reader.title());
    println!("Events: {}", summary.n_events);
    println!(
        "Monitor: {:.4} ({:?})",
        summary.monitor, summary.monitor_source
    );
    println!(
        "Detector horizon: {:.4} deg",
        reader.horizons().detector.get::<degree>()
    );
    println!(
        "Sample horizon: {:.4} deg",
        reader.horizons().sample.get::<degree>()
    );
    println!("Masked: {}", events.masks.masked_count());
    print_range(
        "Wavelength",
        events
            .accepted_range(&events.wavelength_m)
            .map(|(lo, hi)| (lo * 1e10, hi * 1e10)),
        "A",
    );
    print_range("Theta", events.accepted_range(&events.theta_deg), "deg");
    print_range("Qz", events.accepted_range(&events.qz), "1/A");
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Reduce {
            reference,
            sample,
            output,
            config,
            q_min,
            q_max,
            bins,
            log_bins,
            no_gravity,
            no_mask,
            owner,
        } => {
            let start = Instant::now();
            let mut geometry = load_geometry(config.as_deref())?;
            if no_gravity {
                geometry = geometry.with_gravity(false);
            }
            let gravity = geometry.gravity;

            info!("Reading reference: {}", reference.display());
            let reference_run = open_event_reader(&reference, geometry.clone(), !no_mask)?;
            info!("Reading sample: {}", sample.display());
            let sample_run = open_event_reader(&sample, geometry, !no_mask)?;

            let edges = if log_bins {
                log_edges(q_min, q_max, bins)?
            } else {
                linear_edges(q_min, q_max, bins)?
            };
            let reduction = ReflectivityReducer::new(edges)?.reduce(&reference_run, &sample_run)?;

            let person = Person::new(owner.unwrap_or_else(default_owner));
            let header = OrsoHeader::new(
                Creation::now(person.clone()),
                DataSource {
                    origin: Origin::new(person, sample_run.title()),
                    experiment: Experiment::amor(
                        Sample::new(sample_run.title()),
                        Measurement::from_events(sample_run.events()),
                    ),
                },
                ReductionInfo::new(
                    InputFiles {
                        reference: InputFile::from_path(&reference),
                        sample: InputFile::from_path(&sample),
                    },
                    &reduction,
                    gravity,
                ),
            );

            let mut writer = OrsoFileWriter::create(&output)?;
            writer.write(&header, &reduction.reflectivity)?;

            let undefined = reduction.reflectivity.degenerate_bins().len();
            println!(
                "Reduced {} bins ({} undefined) in {:.2}s",
                reduction.reflectivity.len(),
                undefined,
                start.elapsed().as_secs_f64()
            );
            println!(
                "Reference: {} events, monitor {:.4}",
                reduction.totals.reference_counts, reduction.totals.reference_monitor
            );
            println!(
                "Sample: {} events, monitor {:.4}",
                reduction.totals.sample_counts, reduction.totals.sample_monitor
            );
            println!("Output: {}", output.display());
        }

        Commands::Info { input, config } => {
            let geometry = load_geometry(config.as_deref())?;
            let reader = open_event_reader(&input, geometry, true)?;
            print_info(&input, &reader);
        }
    }

    Ok(())
}
