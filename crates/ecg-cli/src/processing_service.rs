//! Command implementations: recording files in, JSON reports out

use anyhow::{bail, Context, Result};
use ecg_core::{EcgSignal, PeakSequence};
use ecg_processing::{
    summarize, Preprocessor, ScoreRecord, SqiConfig, StatisticsReport, MISSING_SENTINEL,
};
use ecg_simulation::{EcgConfig, EcgSimulator, NoiseConfig, RhythmPattern};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Sample array as stored on disk: 1-D for a single channel, otherwise
/// rows of `(samples, channels)`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalArray {
    Single(Vec<f64>),
    Rows(Vec<Vec<f64>>),
}

/// JSON recording exchanged by every command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingFile {
    pub sampling_rate: f64,
    pub signal: SignalArray,
    /// Reference R-peaks, reused for every channel when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peaks: Option<PeakSequence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_frequency: Option<f64>,
}

impl RecordingFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("{} is not a valid recording", path.display()))
    }

    /// Signal plus the optional reference peaks
    pub fn into_parts(self) -> Result<(EcgSignal, Option<PeakSequence>)> {
        let mut signal = match self.signal {
            SignalArray::Single(samples) => EcgSignal::from_samples(samples, self.sampling_rate)?,
            SignalArray::Rows(rows) => EcgSignal::from_rows(rows, self.sampling_rate)?,
        };
        signal.metadata.line_frequency = self.line_frequency;
        Ok((signal, self.peaks))
    }

    pub fn from_signal(signal: &EcgSignal, peaks: Option<PeakSequence>) -> Result<Self> {
        let mut channels = signal.all_channels()?;
        let array = if channels.len() == 1 {
            SignalArray::Single(channels.remove(0))
        } else {
            SignalArray::Rows(
                (0..signal.samples_per_channel())
                    .map(|i| channels.iter().map(|channel| channel[i]).collect())
                    .collect(),
            )
        };
        Ok(RecordingFile {
            sampling_rate: signal.sampling_rate(),
            signal: array,
            peaks,
            line_frequency: signal.metadata.line_frequency,
        })
    }
}

/// Standard configuration, or the validated one stored at `path`
pub fn load_config(path: Option<&Path>) -> Result<SqiConfig> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(SqiConfig::from_json(&text)
                .with_context(|| format!("invalid configuration in {}", path.display()))?)
        }
        None => Ok(SqiConfig::standard()),
    }
}

#[derive(Debug, Clone)]
pub struct BsqiOptions {
    pub input: PathBuf,
    pub config: Option<PathBuf>,
    pub notch: Option<f64>,
    pub bandpass: bool,
    /// Ignore peaks stored in the file and run the reference detector
    pub detect_reference: bool,
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BsqiReport {
    pub sampling_rate: f64,
    pub channels: usize,
    pub line_frequency: Option<f64>,
    pub reference_supplied: bool,
    pub bsqi: Vec<f64>,
    pub records: Vec<ScoreRecord>,
}

pub fn run_bsqi(options: &BsqiOptions) -> Result<BsqiReport> {
    let mut config = load_config(options.config.as_deref())?;
    if options.parallel {
        config = config.with_parallel_channels(true);
    }

    let (signal, peaks) = RecordingFile::load(&options.input)?.into_parts()?;
    let peaks = if options.detect_reference { None } else { peaks };

    let mut preprocessor = Preprocessor::new(signal, config)?;
    if let Some(freq) = options.notch {
        preprocessor.notch(freq)?;
    }
    if options.bandpass {
        preprocessor.bandpass()?;
    }

    let records = preprocessor.score(peaks.as_ref())?;
    let signal = preprocessor.signal();
    tracing::info!(channels = signal.channel_count(), "bsqi computed");

    Ok(BsqiReport {
        sampling_rate: signal.sampling_rate(),
        channels: signal.channel_count(),
        line_frequency: preprocessor.line_frequency(),
        reference_supplied: peaks.is_some(),
        bsqi: records.iter().map(|record| record.f1).collect(),
        records,
    })
}

#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub sampling_rate: f64,
    pub duration: f64,
    pub heart_rate: f64,
    pub channels: usize,
    pub noise: f64,
    /// Relative RR jitter; regular rhythm when absent
    pub rr_jitter: Option<f64>,
    pub powerline: Option<f64>,
    pub seed: Option<u64>,
    pub notch: Option<f64>,
    pub bandpass: bool,
}

/// Simulated recording with the true R-peaks stored as reference peaks
pub fn run_simulate(options: &SimulateOptions) -> Result<RecordingFile> {
    let rhythm = match options.rr_jitter {
        Some(rr_jitter) => RhythmPattern::Irregular { rr_jitter },
        None => RhythmPattern::Regular,
    };
    let config = EcgConfig {
        sampling_rate: options.sampling_rate,
        channel_count: options.channels,
        heart_rate_bpm: options.heart_rate,
        rhythm,
        noise: NoiseConfig {
            gaussian_std: options.noise,
            ..NoiseConfig::default()
        },
        powerline_freq: options.powerline,
        seed: options.seed,
    };

    let simulated = EcgSimulator::new(config)?.generate(options.duration)?;
    let mut preprocessor = Preprocessor::standard(simulated.signal)?;
    if let Some(freq) = options.notch {
        preprocessor.notch(freq)?;
    }
    if options.bandpass {
        preprocessor.bandpass()?;
    }

    RecordingFile::from_signal(preprocessor.signal(), Some(simulated.r_peaks))
}

/// Describe a JSON object of named number arrays; `-1` marks a missing entry
pub fn run_stats(input: &Path) -> Result<StatisticsReport> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&text)
        .with_context(|| format!("{} must contain a JSON object", input.display()))?;

    let mut collections = Vec::with_capacity(object.len());
    for (name, value) in object {
        let Some(items) = value.as_array() else {
            bail!("\"{}\" must be an array of numbers", name);
        };
        let values = items
            .iter()
            .map(|item| match item {
                serde_json::Value::Null => Ok(MISSING_SENTINEL),
                other => other
                    .as_f64()
                    .with_context(|| format!("\"{}\" contains non-numeric value {}", name, other)),
            })
            .collect::<Result<Vec<f64>>>()?;
        collections.push((name, ecg_processing::from_sentinel(&values)));
    }

    Ok(summarize(&collections))
}

/// Detect R-peaks on every channel and describe its RR intervals (s)
pub fn run_rr_stats(input: &Path, config: Option<&Path>) -> Result<StatisticsReport> {
    let config = load_config(config)?;
    let (signal, _) = RecordingFile::load(input)?.into_parts()?;
    let detector = config.detectors.reference.build();
    let fs = signal.sampling_rate();

    let mut collections = Vec::with_capacity(signal.channel_count());
    for (index, channel) in signal.all_channels()?.iter().enumerate() {
        let peaks = detector.detect(channel, fs)?;
        tracing::debug!(channel = index, peaks = peaks.len(), detector = detector.name(), "peaks detected");
        let rr: Vec<Option<f64>> = peaks.rr_intervals(fs).into_iter().map(Some).collect();
        collections.push((signal.metadata.lead(index).to_string(), rr));
    }

    Ok(summarize(&collections))
}
