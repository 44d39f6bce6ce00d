//! Synthetic ECG generator with known R-peak positions

use crate::rhythm_patterns::RhythmPattern;
use ecg_core::{EcgMetadata, EcgSignal, Lead, PeakSequence, SqiError, SqiResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Configuration for ECG simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgConfig {
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Number of leads to simulate
    pub channel_count: usize,
    /// Mean heart rate in beats per minute
    pub heart_rate_bpm: f64,
    /// Beat timing
    pub rhythm: RhythmPattern,
    /// Noise configuration
    pub noise: NoiseConfig,
    /// Power line interference (50/60Hz)
    pub powerline_freq: Option<f64>,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

/// Noise configuration for synthetic ECG
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Gaussian noise standard deviation (mV)
    pub gaussian_std: f64,
    /// Baseline wander amplitude (mV)
    pub baseline_wander: f64,
    /// Baseline wander frequency (Hz), respiration-like
    pub baseline_frequency: f64,
    /// Power-line interference amplitude (mV)
    pub powerline_amplitude: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            gaussian_std: 0.02,
            baseline_wander: 0.1,
            baseline_frequency: 0.25,
            powerline_amplitude: 0.05,
        }
    }
}

impl NoiseConfig {
    /// No noise of any kind
    pub fn clean() -> Self {
        Self {
            gaussian_std: 0.0,
            baseline_wander: 0.0,
            baseline_frequency: 0.25,
            powerline_amplitude: 0.0,
        }
    }
}

impl Default for EcgConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 500.0,
            channel_count: 1,
            heart_rate_bpm: 72.0,
            rhythm: RhythmPattern::Regular,
            noise: NoiseConfig::default(),
            powerline_freq: Some(50.0),
            seed: None,
        }
    }
}

/// One Gaussian deflection of the PQRST complex
#[derive(Debug, Clone, Copy)]
struct Wave {
    /// Offset from the R peak (s)
    offset: f64,
    /// Amplitude (mV)
    amplitude: f64,
    /// Width (s)
    width: f64,
}

const PQRST: [Wave; 5] = [
    Wave { offset: -0.200, amplitude: 0.15, width: 0.025 },
    Wave { offset: -0.025, amplitude: -0.10, width: 0.010 },
    Wave { offset: 0.000, amplitude: 1.00, width: 0.010 },
    Wave { offset: 0.025, amplitude: -0.25, width: 0.010 },
    Wave { offset: 0.300, amplitude: 0.30, width: 0.050 },
];

/// Projection gain of the cardiac vector onto a lead
fn lead_gain(lead: Lead) -> f64 {
    match lead {
        Lead::I => 0.7,
        Lead::II => 1.0,
        Lead::III => 0.5,
        Lead::AVR => -0.8,
        Lead::AVL => 0.3,
        Lead::AVF => 0.75,
        Lead::V1 => 0.4,
        Lead::V2 => 0.8,
        Lead::V3 => 1.1,
        Lead::V4 => 1.3,
        Lead::V5 => 1.2,
        Lead::V6 => 0.9,
        Lead::Other(_) => 1.0,
    }
}

/// Simulated recording together with its true beat positions
#[derive(Debug, Clone)]
pub struct SimulatedEcg {
    pub signal: EcgSignal,
    /// R-peak sample indices
    pub r_peaks: PeakSequence,
}

/// ECG signal simulator
pub struct EcgSimulator {
    config: EcgConfig,
    rng: StdRng,
    noise_dist: Normal<f64>,
}

impl EcgSimulator {
    /// Create new ECG simulator with configuration
    pub fn new(config: EcgConfig) -> SqiResult<Self> {
        EcgMetadata::validate_sampling_rate(config.sampling_rate)?;
        EcgMetadata::validate_channel_count(config.channel_count)?;
        if !config.heart_rate_bpm.is_finite() || config.heart_rate_bpm <= 0.0 {
            return Err(SqiError::not_positive("heart_rate_bpm", config.heart_rate_bpm));
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let noise_dist = Normal::new(0.0, config.noise.gaussian_std).map_err(|e| {
            SqiError::ConfigurationError {
                message: format!("Failed to create normal distribution: {}", e),
            }
        })?;

        Ok(EcgSimulator {
            config,
            rng,
            noise_dist,
        })
    }

    /// Generate `duration` seconds of ECG
    pub fn generate(&mut self, duration: f64) -> SqiResult<SimulatedEcg> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(SqiError::not_positive("duration", duration));
        }
        let fs = self.config.sampling_rate;
        let samples = (duration * fs).round() as usize;
        let channels = self.config.channel_count;

        let leads = if channels <= 12 {
            Lead::standard_twelve()[..channels].to_vec()
        } else {
            Lead::unlabelled(channels)
        };

        let beats = self
            .config
            .rhythm
            .beat_times(self.config.heart_rate_bpm, duration, &mut self.rng);
        let template = self.render_beats(&beats, samples);

        let mut data = Vec::with_capacity(samples * channels);
        for i in 0..samples {
            let t = i as f64 / fs;
            for lead in &leads {
                let mut value = lead_gain(*lead) * template[i];
                value += self.config.noise.baseline_wander
                    * (2.0 * PI * self.config.noise.baseline_frequency * t).sin();
                if let Some(freq) = self.config.powerline_freq {
                    value += self.config.noise.powerline_amplitude * (2.0 * PI * freq * t).sin();
                }
                value += self.noise_dist.sample(&mut self.rng);
                data.push(value);
            }
        }

        let r_peaks = beats
            .iter()
            .map(|t| (t * fs).round() as usize)
            .filter(|&i| i < samples)
            .collect();

        let metadata = EcgMetadata::new(fs, channels)?.with_leads(leads)?;
        let signal = EcgSignal::new(data, metadata)?;

        tracing::debug!(
            samples,
            channels,
            beats = beats.len(),
            rhythm = self.config.rhythm.description(),
            "simulated ECG"
        );
        Ok(SimulatedEcg { signal, r_peaks })
    }

    /// Noise-free single-lead waveform with unit R amplitude
    fn render_beats(&self, beats: &[f64], samples: usize) -> Vec<f64> {
        let fs = self.config.sampling_rate;
        let mut template = vec![0.0; samples];

        for &beat in beats {
            for wave in &PQRST {
                let centre = (beat + wave.offset) * fs;
                let sigma = wave.width * fs;
                let start = (centre - 4.0 * sigma).floor().max(0.0) as usize;
                let end = ((centre + 4.0 * sigma).ceil().max(0.0) as usize).min(samples);
                for (i, value) in template.iter_mut().enumerate().take(end).skip(start) {
                    let d = i as f64 - centre;
                    *value += wave.amplitude * (-d * d / (2.0 * sigma * sigma)).exp();
                }
            }
        }
        template
    }

    pub fn config(&self) -> &EcgConfig {
        &self.config
    }
}
