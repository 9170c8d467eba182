//! Command-line front end: transport a JSON batch through the dipole converter

use chrono::NaiveDateTime;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

use aacgm_vector::logging::init_logging;
use aacgm_vector::{
    BatchDriver, ConfigurationManager, DipoleConverter, EpochContext, GeoSample, SampleRecord,
};

#[derive(Parser)]
#[command(name = "aacgm-vector")]
#[command(about = "Transport magnetic perturbation vectors into AACGM coordinates", long_about = None)]
struct Args {
    /// JSON job file with an epoch and a list of samples
    #[arg(long)]
    job: PathBuf,

    /// JSON transport configuration (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write results here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Perturbation step in km, overrides the configuration
    #[arg(long)]
    step_km: Option<f64>,

    /// Run samples in parallel, overrides the configuration
    #[arg(long)]
    parallel: bool,

    /// Fix the dipole pole latitude instead of following IGRF
    #[arg(long, requires = "pole_lon", allow_negative_numbers = true)]
    pole_lat: Option<f64>,

    /// Fix the dipole pole longitude instead of following IGRF
    #[arg(long, requires = "pole_lat", allow_negative_numbers = true)]
    pole_lon: Option<f64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct Job {
    epoch: NaiveDateTime,
    samples: Vec<GeoSample>,
}

#[derive(Debug, Serialize)]
struct Report {
    epoch: NaiveDateTime,
    succeeded: usize,
    failed: usize,
    results: Vec<SampleRecord>,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("Error: failed to initialise logging: {}", e);
        process::exit(1);
    }

    if let Err(message) = run(args) {
        error!("{}", message);
        eprintln!("Error: {}", message);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), String> {
    let mut manager = match &args.config {
        Some(path) => ConfigurationManager::from_file(path).map_err(|e| e.to_string())?,
        None => ConfigurationManager::new(),
    };
    if let Some(step_km) = args.step_km {
        manager.set_step_km(step_km).map_err(|e| e.to_string())?;
    }
    if args.parallel {
        manager.set_parallel(true);
    }

    let content = fs::read_to_string(&args.job)
        .map_err(|e| format!("Failed to read job file '{}': {}", args.job.display(), e))?;
    let job: Job = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse job file '{}': {}", args.job.display(), e))?;

    let converter = match (args.pole_lat, args.pole_lon) {
        (Some(lat), Some(lon)) => DipoleConverter::with_fixed_pole(lat, lon),
        _ => DipoleConverter::new(),
    }
    .with_earth_radius_km(manager.get_config().earth_radius_km);

    let mut driver =
        BatchDriver::with_config(converter, manager.get_config().clone()).map_err(|e| e.to_string())?;
    driver
        .set_epoch(EpochContext::from_datetime(job.epoch))
        .map_err(|e| e.to_string())?;

    info!(samples = job.samples.len(), job = %args.job.display(), "running batch");
    let outcome = driver.run(&job.samples);

    let report = Report {
        epoch: job.epoch,
        succeeded: outcome.success_count(),
        failed: outcome.failure_count(),
        results: outcome.to_records(),
    };
    let json = serde_json::to_string_pretty(&report).map_err(|e| format!("Failed to serialize results: {}", e))?;

    match &args.output {
        Some(path) => {
            fs::write(path, json).map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
            info!(output = %path.display(), "results written");
        }
        None => println!("{}", json),
    }

    Ok(())
}
