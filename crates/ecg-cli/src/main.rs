//! ecg-sqi: ECG signal quality from peak-detector agreement

mod processing_service;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use processing_service::{BsqiOptions, SimulateOptions};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ecg-sqi", version, about = "Beat-agreement signal quality index for ECG recordings")]
struct Cli {
    /// Log processing steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write the JSON report to a file instead of stdout
    #[arg(short, long, global = true, value_name = "FILE")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every channel of a recording
    Bsqi {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
        /// Configuration JSON (standard settings when omitted)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Remove power-line interference at this frequency first (Hz)
        #[arg(long, value_name = "HZ")]
        notch: Option<f64>,
        /// Apply the wide band-pass before scoring
        #[arg(long)]
        bandpass: bool,
        /// Ignore peaks stored in the recording and detect the reference
        #[arg(long)]
        detect_reference: bool,
        /// Score channels in parallel
        #[arg(long)]
        parallel: bool,
    },
    /// Generate a synthetic recording with its true R-peaks
    Simulate {
        #[arg(long, default_value_t = 500.0)]
        sampling_rate: f64,
        /// Length in seconds
        #[arg(long, default_value_t = 10.0)]
        duration: f64,
        /// Beats per minute
        #[arg(long, default_value_t = 72.0)]
        heart_rate: f64,
        #[arg(long, default_value_t = 1)]
        channels: usize,
        /// Gaussian noise standard deviation (mV)
        #[arg(long, default_value_t = 0.02)]
        noise: f64,
        /// Relative RR-interval jitter for an irregular rhythm
        #[arg(long)]
        rr_jitter: Option<f64>,
        /// Add power-line interference at this frequency (Hz)
        #[arg(long, value_name = "HZ")]
        powerline: Option<f64>,
        #[arg(long)]
        seed: Option<u64>,
        /// Notch the simulated signal at this frequency (Hz)
        #[arg(long, value_name = "HZ")]
        notch: Option<f64>,
        #[arg(long)]
        bandpass: bool,
    },
    /// Descriptive statistics of named measurements (-1 = missing)
    Stats {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },
    /// Detect beats per channel and summarize RR intervals
    RrStats {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn emit<T: Serialize>(report: &T, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let output = cli.output.as_ref();
    match cli.cmd {
        Commands::Bsqi { input, config, notch, bandpass, detect_reference, parallel } => {
            let report = processing_service::run_bsqi(&BsqiOptions {
                input,
                config,
                notch,
                bandpass,
                detect_reference,
                parallel,
            })?;
            emit(&report, output)
        }
        Commands::Simulate {
            sampling_rate,
            duration,
            heart_rate,
            channels,
            noise,
            rr_jitter,
            powerline,
            seed,
            notch,
            bandpass,
        } => {
            let recording = processing_service::run_simulate(&SimulateOptions {
                sampling_rate,
                duration,
                heart_rate,
                channels,
                noise,
                rr_jitter,
                powerline,
                seed,
                notch,
                bandpass,
            })?;
            emit(&recording, output)
        }
        Commands::Stats { input } => emit(&processing_service::run_stats(&input)?, output),
        Commands::RrStats { input, config } => {
            let report = processing_service::run_rr_stats(&input, config.as_deref())?;
            emit(&report, output)
        }
    }
}
