//! Agreement scoring between two peak sequences

use crate::matcher::{match_peaks, Match};
use ecg_core::{SqiError, SqiResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Matching tolerance expressed in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceWindow {
    seconds: f64,
}

impl ToleranceWindow {
    pub fn new(seconds: f64) -> SqiResult<Self> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(SqiError::not_positive("window_seconds", seconds));
        }
        Ok(ToleranceWindow { seconds })
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    /// Window length in samples at `sampling_rate`
    pub fn in_samples(&self, sampling_rate: f64) -> f64 {
        self.seconds * sampling_rate
    }
}

impl Default for ToleranceWindow {
    fn default() -> Self {
        ToleranceWindow {
            seconds: crate::config::DEFAULT_WINDOW_SECONDS,
        }
    }
}

/// True positives, false positives and false negatives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

/// Per-channel agreement record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Harmonic mean of sensitivity and positive predictive value
    pub f1: f64,
    /// Sensitivity (recall)
    pub se: f64,
    /// Positive predictive value (precision)
    pub ppv: f64,
    /// Mean absolute offset of matched peaks in seconds; absent when
    /// nothing matched
    pub mean_timing_error: Option<f64>,
    pub counts: ConfusionCounts,
}

impl ScoreRecord {
    /// Zero score for degenerate inputs
    pub fn zero(n_reference: usize, n_test: usize) -> Self {
        ScoreRecord {
            f1: 0.0,
            se: 0.0,
            ppv: 0.0,
            mean_timing_error: None,
            counts: ConfusionCounts {
                tp: 0,
                fp: n_test,
                fn_: n_reference,
            },
        }
    }
}

/// Score already-computed matches
///
/// The window is exclusive: a match exactly `window_samples` away is a miss.
/// A reference peak is counted once no matter how many test peaks claim
/// it; the timing error uses the first in-window claim of each reference
/// peak in test order.
pub fn score_matches(
    matches: &[Match],
    n_reference: usize,
    n_test: usize,
    window_samples: f64,
) -> ScoreRecord {
    let mut claimed = HashSet::new();
    let mut distances = Vec::new();
    for m in matches.iter().filter(|m| (m.distance as f64) < window_samples) {
        if claimed.insert(m.reference_index) {
            distances.push(m.distance as f64);
        }
    }

    let tp = claimed.len();
    let counts = ConfusionCounts {
        tp,
        fp: n_test - tp,
        fn_: n_reference - tp,
    };

    let se = if n_reference > 0 { tp as f64 / n_reference as f64 } else { 0.0 };
    let ppv = if n_test > 0 { tp as f64 / n_test as f64 } else { 0.0 };
    if se + ppv == 0.0 {
        return ScoreRecord { counts, ..ScoreRecord::zero(n_reference, n_test) };
    }

    ScoreRecord {
        f1: 2.0 * se * ppv / (se + ppv),
        se,
        ppv,
        mean_timing_error: Some(distances.iter().sum::<f64>() / distances.len() as f64),
        counts,
    }
}

/// Score a test peak sequence against a reference sequence
///
/// Either sequence being empty yields a zero score without matching.
/// Timing error is converted to seconds with `sampling_rate`.
pub fn score_peaks(
    reference: &[usize],
    test: &[usize],
    window: ToleranceWindow,
    sampling_rate: f64,
) -> SqiResult<ScoreRecord> {
    if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
        return Err(SqiError::not_positive("sampling_rate", sampling_rate));
    }
    if reference.is_empty() || test.is_empty() {
        return Ok(ScoreRecord::zero(reference.len(), test.len()));
    }

    let matches = match_peaks(reference, test)?;
    let window_samples = window.in_samples(sampling_rate);
    let mut record = score_matches(&matches, reference.len(), test.len(), window_samples);
    record.mean_timing_error = record.mean_timing_error.map(|samples| samples / sampling_rate);
    Ok(record)
}
