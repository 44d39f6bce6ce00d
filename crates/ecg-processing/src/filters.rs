//! Zero-phase ECG pre-filters: power-line notch and wide band-pass

use crate::butterworth::{butterworth, iir_notch, BandShape, SosFilter};
use crate::config::{BandpassSettings, NotchSettings};
use crate::processor::{ProcessingMetrics, SignalProcessor};
use ecg_core::{EcgSignal, SqiError, SqiResult};
use serde::{Deserialize, Serialize};

/// Filter types supported by the framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    /// Butterworth band-pass
    ButterworthBandpass,
    /// Butterworth high-pass (band-pass fallback at low sampling rates)
    ButterworthHighpass,
    /// Notch filter for power-line interference
    Notch,
}

/// Apply a filter forward-backward to every channel independently
fn filter_channels(input: &EcgSignal, sos: &SosFilter, stage: &str) -> SqiResult<EcgSignal> {
    let timer = ProcessingMetrics::start_timing(stage);

    let filtered = input
        .all_channels()?
        .iter()
        .map(|channel| sos.filtfilt(channel))
        .collect();

    let mut output = input.clone();
    output.replace_channels(filtered)?;

    timer.finish(output.channel_count(), output.samples_per_channel());
    Ok(output)
}

/// Power-line notch filter
#[derive(Debug, Clone, PartialEq)]
pub struct NotchFilter {
    notch_freq: f64,
    q_factor: f64,
}

impl NotchFilter {
    /// Create a notch at `notch_freq` Hz; the frequency must be strictly positive
    pub fn new(notch_freq: f64, settings: NotchSettings) -> SqiResult<Self> {
        if !notch_freq.is_finite() || notch_freq <= 0.0 {
            return Err(SqiError::not_positive("notch_frequency", notch_freq));
        }
        Ok(NotchFilter {
            notch_freq,
            q_factor: settings.q_factor,
        })
    }

    pub fn notch_freq(&self) -> f64 {
        self.notch_freq
    }

    /// Coefficients for a given sampling rate
    pub fn design(&self, sampling_rate: f64) -> SqiResult<SosFilter> {
        iir_notch(self.notch_freq, self.q_factor, sampling_rate)
    }
}

impl SignalProcessor for NotchFilter {
    fn process(&self, input: &EcgSignal) -> SqiResult<EcgSignal> {
        let sos = self.design(input.sampling_rate())?;
        filter_channels(input, &sos, self.name())
    }

    fn name(&self) -> &str {
        "Notch Filter"
    }
}

/// Band-pass design actually used for a given sampling rate
#[derive(Debug, Clone, PartialEq)]
pub enum BandpassDesign {
    /// Full band-pass between the low and high cutoffs
    Bandpass(SosFilter),
    /// High-pass at the low cutoff; the high cutoff is at or above Nyquist
    HighpassOnly(SosFilter),
}

impl BandpassDesign {
    pub fn sos(&self) -> &SosFilter {
        match self {
            BandpassDesign::Bandpass(sos) | BandpassDesign::HighpassOnly(sos) => sos,
        }
    }

    pub fn filter_type(&self) -> FilterType {
        match self {
            BandpassDesign::Bandpass(_) => FilterType::ButterworthBandpass,
            BandpassDesign::HighpassOnly(_) => FilterType::ButterworthHighpass,
        }
    }
}

/// Wide ECG band-pass (baseline wander and high-frequency noise removal)
#[derive(Debug, Clone, PartialEq)]
pub struct BandpassFilter {
    settings: BandpassSettings,
}

impl BandpassFilter {
    pub fn new(settings: BandpassSettings) -> Self {
        BandpassFilter { settings }
    }

    pub fn settings(&self) -> &BandpassSettings {
        &self.settings
    }

    /// Pick the design for `sampling_rate`
    ///
    /// When `fs <= 2 * high_cutoff` the upper edge cannot be represented and
    /// only the high-pass part is applied.
    pub fn design(&self, sampling_rate: f64) -> SqiResult<BandpassDesign> {
        let BandpassSettings { low_cutoff, high_cutoff, order } = self.settings;

        if sampling_rate <= 2.0 * high_cutoff {
            tracing::debug!(
                sampling_rate,
                high_cutoff,
                "upper band edge at or above Nyquist, using high-pass only"
            );
            let sos = butterworth(order, BandShape::Highpass { cutoff: low_cutoff }, sampling_rate)?;
            Ok(BandpassDesign::HighpassOnly(sos))
        } else {
            let sos = butterworth(
                order,
                BandShape::Bandpass { low: low_cutoff, high: high_cutoff },
                sampling_rate,
            )?;
            Ok(BandpassDesign::Bandpass(sos))
        }
    }
}

impl Default for BandpassFilter {
    fn default() -> Self {
        Self::new(BandpassSettings::default())
    }
}

impl SignalProcessor for BandpassFilter {
    fn process(&self, input: &EcgSignal) -> SqiResult<EcgSignal> {
        let design = self.design(input.sampling_rate())?;
        filter_channels(input, design.sos(), self.name())
    }

    fn name(&self) -> &str {
        "Butterworth Band-pass"
    }
}
