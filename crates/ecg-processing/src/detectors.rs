//! Fiducial (R-peak) detectors
//!
//! Detectors are pure functions of `(channel samples, sampling rate)`. Two
//! built-in algorithms cover the reference and test roles of the agreement
//! score; anything else can be plugged in through [`FnDetector`].

use crate::butterworth::{butterworth, BandShape, SosFilter};
use ecg_core::{EcgMetadata, PeakSequence, SqiResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability interface for R-peak detection on a single channel
pub trait FiducialDetector: Send + Sync {
    /// Detector name used in logs and reports
    fn name(&self) -> &str;

    /// Detect peaks; indices must be sorted and unique, possibly empty
    fn detect(&self, channel: &[f64], sampling_rate: f64) -> SqiResult<PeakSequence>;
}

/// Built-in detector selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    PanTompkins,
    Wavelet,
}

impl DetectorKind {
    pub fn build(self) -> Box<dyn FiducialDetector> {
        match self {
            DetectorKind::PanTompkins => Box::new(PanTompkinsDetector::default()),
            DetectorKind::Wavelet => Box::new(WaveletDetector::default()),
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorKind::PanTompkins => write!(f, "pan_tompkins"),
            DetectorKind::Wavelet => write!(f, "wavelet"),
        }
    }
}

/// Adapter turning a closure into a detector
pub struct FnDetector<F> {
    name: String,
    func: F,
}

impl<F> FnDetector<F>
where
    F: Fn(&[f64], f64) -> SqiResult<PeakSequence> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        FnDetector {
            name: name.into(),
            func,
        }
    }
}

impl<F> FiducialDetector for FnDetector<F>
where
    F: Fn(&[f64], f64) -> SqiResult<PeakSequence> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self, channel: &[f64], sampling_rate: f64) -> SqiResult<PeakSequence> {
        (self.func)(channel, sampling_rate)
    }
}

/// Seconds to whole samples, never less than one
fn seconds_to_samples(seconds: f64, sampling_rate: f64) -> usize {
    (seconds * sampling_rate).round().max(1.0) as usize
}

/// QRS emphasis band; falls back to high-pass when the upper edge is not
/// representable at this sampling rate
///
/// `None` when even the lower edge sits at or above Nyquist: such a record
/// carries no QRS band and yields no beats.
fn qrs_band(low: f64, high: f64, order: usize, sampling_rate: f64) -> SqiResult<Option<SosFilter>> {
    let nyquist = sampling_rate / 2.0;
    if low >= nyquist {
        tracing::debug!(sampling_rate, low_cutoff = low, "QRS band above Nyquist, no detection");
        return Ok(None);
    }
    let sos = if high < nyquist {
        butterworth(order, BandShape::Bandpass { low, high }, sampling_rate)?
    } else {
        butterworth(order, BandShape::Highpass { cutoff: low }, sampling_rate)?
    };
    Ok(Some(sos))
}

/// Index of the largest `|x|` in `signal[start..=end]`, first one on ties
fn abs_argmax(signal: &[f64], start: usize, end: usize) -> usize {
    let end = end.min(signal.len() - 1);
    let mut best = start;
    for i in start..=end {
        if signal[i].abs() > signal[best].abs() {
            best = i;
        }
    }
    best
}

fn is_local_max(signal: &[f64], i: usize) -> bool {
    signal[i] > signal[i - 1] && signal[i] >= signal[i + 1]
}

/// Pan-Tompkins QRS detector
///
/// Band-pass, five-point derivative, squaring and moving-window integration
/// followed by adaptive signal/noise thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct PanTompkinsDetector {
    pub low_cutoff: f64,
    pub high_cutoff: f64,
    /// Integration window (s)
    pub integration_window: f64,
    /// Refractory period (s)
    pub refractory: f64,
    /// Threshold learning period (s)
    pub learning_period: f64,
}

impl Default for PanTompkinsDetector {
    fn default() -> Self {
        PanTompkinsDetector {
            low_cutoff: 5.0,
            high_cutoff: 15.0,
            integration_window: 0.150,
            refractory: 0.200,
            learning_period: 2.0,
        }
    }
}

impl PanTompkinsDetector {
    /// y[n] = (-x[n-2] - 2x[n-1] + 2x[n+1] + x[n+2]) * fs / 8
    fn derivative(signal: &[f64], sampling_rate: f64) -> Vec<f64> {
        let n = signal.len();
        let mut out = vec![0.0; n];
        for i in 2..n.saturating_sub(2) {
            out[i] = (-signal[i - 2] - 2.0 * signal[i - 1] + 2.0 * signal[i + 1] + signal[i + 2])
                * sampling_rate
                / 8.0;
        }
        out
    }

    /// Trailing moving average of width `window`
    fn integrate(signal: &[f64], window: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(signal.len());
        let mut sum = 0.0;
        for i in 0..signal.len() {
            sum += signal[i];
            if i >= window {
                sum -= signal[i - window];
            }
            out.push(sum / (i + 1).min(window) as f64);
        }
        out
    }

    fn threshold_peaks(&self, mwi: &[f64], sampling_rate: f64) -> Vec<usize> {
        let n = mwi.len();
        let learn = seconds_to_samples(self.learning_period, sampling_rate).min(n);
        let refractory = seconds_to_samples(self.refractory, sampling_rate);

        let max_init = mwi[..learn].iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean_init = mwi[..learn].iter().sum::<f64>() / learn as f64;

        let mut spki = 0.25 * max_init;
        let mut npki = 0.5 * mean_init;
        let mut threshold = npki + 0.25 * (spki - npki);

        let mut peaks: Vec<usize> = Vec::new();
        for i in 1..n - 1 {
            if !is_local_max(mwi, i) {
                continue;
            }
            if mwi[i] > threshold {
                match peaks.last_mut() {
                    Some(last) if i - *last < refractory => {
                        // keep the stronger of two candidates inside the refractory period
                        if mwi[i] > mwi[*last] {
                            *last = i;
                        }
                    }
                    _ => peaks.push(i),
                }
                spki = 0.125 * mwi[i] + 0.875 * spki;
            } else {
                npki = 0.125 * mwi[i] + 0.875 * npki;
            }
            threshold = npki + 0.25 * (spki - npki);
        }
        peaks
    }
}

impl FiducialDetector for PanTompkinsDetector {
    fn name(&self) -> &str {
        "pan_tompkins"
    }

    fn detect(&self, channel: &[f64], sampling_rate: f64) -> SqiResult<PeakSequence> {
        EcgMetadata::validate_sampling_rate(sampling_rate)?;
        let window = seconds_to_samples(self.integration_window, sampling_rate);
        if channel.len() < 5 {
            return Ok(PeakSequence::empty());
        }

        let Some(band) = qrs_band(self.low_cutoff, self.high_cutoff, 2, sampling_rate)? else {
            return Ok(PeakSequence::empty());
        };
        let filtered = band.filtfilt(channel);
        let squared: Vec<f64> = Self::derivative(&filtered, sampling_rate)
            .into_iter()
            .map(|x| x * x)
            .collect();
        let mwi = Self::integrate(&squared, window);

        // integration delays the energy peak by up to one window
        let peaks = self
            .threshold_peaks(&mwi, sampling_rate)
            .into_iter()
            .map(|i| abs_argmax(&filtered, i.saturating_sub(window), i))
            .collect();

        let peaks = PeakSequence::normalized(peaks);
        tracing::trace!(detector = self.name(), peaks = peaks.len(), "detection finished");
        Ok(peaks)
    }
}

/// Matched-filter detector built on a Ricker (Mexican-hat) wavelet
#[derive(Debug, Clone, PartialEq)]
pub struct WaveletDetector {
    pub low_cutoff: f64,
    pub high_cutoff: f64,
    /// Wavelet width parameter (s)
    pub wavelet_width: f64,
    /// Refractory period (s)
    pub refractory: f64,
    /// Threshold learning period (s)
    pub learning_period: f64,
    /// Half-width of the refinement search (s)
    pub refine_radius: f64,
}

impl Default for WaveletDetector {
    fn default() -> Self {
        WaveletDetector {
            low_cutoff: 5.0,
            high_cutoff: 20.0,
            wavelet_width: 0.020,
            refractory: 0.250,
            learning_period: 2.0,
            refine_radius: 0.050,
        }
    }
}

impl WaveletDetector {
    /// Zero-mean Ricker kernel sampled over +/- 4 widths
    fn ricker_kernel(&self, sampling_rate: f64) -> Vec<f64> {
        let a = self.wavelet_width * sampling_rate;
        let half = (4.0 * a).round().max(1.0) as isize;
        let kernel: Vec<f64> = (-half..=half)
            .map(|k| {
                let t = k as f64 / a;
                (1.0 - t * t) * (-t * t / 2.0).exp()
            })
            .collect();
        let mean = kernel.iter().sum::<f64>() / kernel.len() as f64;
        kernel.into_iter().map(|v| v - mean).collect()
    }

    /// Centred correlation, same length as the input
    fn correlate(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
        let n = signal.len() as isize;
        let half = (kernel.len() / 2) as isize;
        (0..n)
            .map(|i| {
                kernel
                    .iter()
                    .enumerate()
                    .filter_map(|(k, w)| {
                        let j = i + k as isize - half;
                        (0..n).contains(&j).then(|| w * signal[j as usize])
                    })
                    .sum()
            })
            .collect()
    }

    fn threshold_peaks(&self, energy: &[f64], sampling_rate: f64) -> Vec<usize> {
        let n = energy.len();
        let learn = seconds_to_samples(self.learning_period, sampling_rate).min(n);
        let refractory = seconds_to_samples(self.refractory, sampling_rate);

        let mut signal_level = energy[..learn].iter().cloned().fold(0.0, f64::max);
        let mut noise_level = energy[..learn].iter().sum::<f64>() / learn as f64;
        let mut threshold = noise_level + 0.3 * (signal_level - noise_level);

        let mut peaks: Vec<usize> = Vec::new();
        for i in 1..n - 1 {
            if !is_local_max(energy, i) {
                continue;
            }
            if energy[i] > threshold {
                match peaks.last_mut() {
                    Some(last) if i - *last < refractory => {
                        if energy[i] > energy[*last] {
                            *last = i;
                        }
                    }
                    _ => peaks.push(i),
                }
                signal_level = 0.125 * energy[i] + 0.875 * signal_level;
            } else {
                noise_level = 0.125 * energy[i] + 0.875 * noise_level;
            }
            threshold = noise_level + 0.3 * (signal_level - noise_level);
        }

        self.search_back(energy, peaks, 0.5 * threshold, refractory)
    }

    /// Recover beats inside RR gaps much longer than the running average
    fn search_back(
        &self,
        energy: &[f64],
        mut peaks: Vec<usize>,
        threshold: f64,
        refractory: usize,
    ) -> Vec<usize> {
        if peaks.len() < 3 {
            return peaks;
        }
        let mean_rr = (peaks[peaks.len() - 1] - peaks[0]) as f64 / (peaks.len() - 1) as f64;

        let mut recovered = Vec::new();
        for pair in peaks.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if ((next - prev) as f64) < 1.66 * mean_rr {
                continue;
            }
            let start = prev + refractory;
            let end = next.saturating_sub(refractory);
            if start >= end {
                continue;
            }
            let candidate = (start..end).fold(start, |best, i| {
                if energy[i] > energy[best] {
                    i
                } else {
                    best
                }
            });
            if energy[candidate] > threshold {
                recovered.push(candidate);
            }
        }

        if !recovered.is_empty() {
            tracing::trace!(recovered = recovered.len(), "search-back recovered beats");
            peaks.extend(recovered);
            peaks.sort_unstable();
        }
        peaks
    }
}

impl FiducialDetector for WaveletDetector {
    fn name(&self) -> &str {
        "wavelet"
    }

    fn detect(&self, channel: &[f64], sampling_rate: f64) -> SqiResult<PeakSequence> {
        EcgMetadata::validate_sampling_rate(sampling_rate)?;
        if channel.len() < 5 {
            return Ok(PeakSequence::empty());
        }

        let Some(band) = qrs_band(self.low_cutoff, self.high_cutoff, 2, sampling_rate)? else {
            return Ok(PeakSequence::empty());
        };
        let filtered = band.filtfilt(channel);
        let energy: Vec<f64> = Self::correlate(&filtered, &self.ricker_kernel(sampling_rate))
            .into_iter()
            .map(|x| x * x)
            .collect();

        let radius = seconds_to_samples(self.refine_radius, sampling_rate);
        let peaks = self
            .threshold_peaks(&energy, sampling_rate)
            .into_iter()
            .map(|i| abs_argmax(&filtered, i.saturating_sub(radius), i + radius))
            .collect();

        let peaks = PeakSequence::normalized(peaks);
        tracing::trace!(detector = self.name(), peaks = peaks.len(), "detection finished");
        Ok(peaks)
    }
}
