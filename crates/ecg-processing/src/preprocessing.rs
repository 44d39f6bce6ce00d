//! Signal holder tying filtering and agreement scoring together

use crate::config::SqiConfig;
use crate::detectors::FiducialDetector;
use crate::filters::{BandpassFilter, NotchFilter};
use crate::orchestrator::ChannelOrchestrator;
use crate::processor::SignalProcessor;
use crate::scorer::{ScoreRecord, ToleranceWindow};
use ecg_core::{EcgSignal, PeakSequence, SqiResult};

/// Owns a signal, filters it in place and scores it
///
/// Filtering replaces the stored signal; scoring only reads it, so the two
/// must not be interleaved from different threads on the same holder.
pub struct Preprocessor {
    signal: EcgSignal,
    config: SqiConfig,
    orchestrator: ChannelOrchestrator,
}

impl Preprocessor {
    pub fn new(signal: EcgSignal, config: SqiConfig) -> SqiResult<Self> {
        let orchestrator = ChannelOrchestrator::from_config(&config)?;
        Ok(Preprocessor {
            signal,
            config,
            orchestrator,
        })
    }

    /// Holder with the standard configuration
    pub fn standard(signal: EcgSignal) -> SqiResult<Self> {
        Self::new(signal, SqiConfig::standard())
    }

    /// Swap in custom reference and test detectors
    pub fn with_detectors(
        mut self,
        reference: Box<dyn FiducialDetector>,
        test: Box<dyn FiducialDetector>,
    ) -> SqiResult<Self> {
        let window = ToleranceWindow::new(self.config.window_seconds)?;
        self.orchestrator = ChannelOrchestrator::new(reference, test, window)
            .with_parallel(self.config.parallel_channels);
        Ok(self)
    }

    pub fn signal(&self) -> &EcgSignal {
        &self.signal
    }

    pub fn into_signal(self) -> EcgSignal {
        self.signal
    }

    pub fn config(&self) -> &SqiConfig {
        &self.config
    }

    /// Last notch frequency applied, if any
    pub fn line_frequency(&self) -> Option<f64> {
        self.signal.metadata.line_frequency
    }

    /// Remove power-line interference at `line_frequency` Hz from every channel
    pub fn notch(&mut self, line_frequency: f64) -> SqiResult<&EcgSignal> {
        let filter = NotchFilter::new(line_frequency, self.config.notch)?;
        let mut filtered = filter.process(&self.signal)?;
        filtered.metadata.line_frequency = Some(line_frequency);
        self.signal = filtered;
        tracing::info!(line_frequency, "notch filter applied");
        Ok(&self.signal)
    }

    /// Apply the configured zero-phase band-pass to every channel
    pub fn bandpass(&mut self) -> SqiResult<&EcgSignal> {
        let filter = BandpassFilter::new(self.config.bandpass);
        self.signal = filter.process(&self.signal)?;
        tracing::info!(
            low = self.config.bandpass.low_cutoff,
            high = self.config.bandpass.high_cutoff,
            "band-pass filter applied"
        );
        Ok(&self.signal)
    }

    /// F1 agreement per channel; a supplied `peaks` sequence is used as
    /// the reference for every channel
    pub fn bsqi(&self, peaks: Option<&PeakSequence>) -> SqiResult<Vec<f64>> {
        self.orchestrator.bsqi(&self.signal, peaks)
    }

    /// Full score records per channel
    pub fn score(&self, peaks: Option<&PeakSequence>) -> SqiResult<Vec<ScoreRecord>> {
        self.orchestrator.score_channels(&self.signal, peaks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::FnDetector;
    use ecg_core::SqiError;
    use std::f64::consts::PI;

    fn noisy_tone(fs: f64, samples: usize) -> EcgSignal {
        let data = (0..samples)
            .map(|i| {
                let t = i as f64 / fs;
                (2.0 * PI * 5.0 * t).sin() + 0.3 * (2.0 * PI * 60.0 * t).sin()
            })
            .collect();
        EcgSignal::from_samples(data, fs).unwrap()
    }

    #[test]
    fn test_notch_stores_signal_and_line_frequency() {
        let mut pre = Preprocessor::standard(noisy_tone(500.0, 2000)).unwrap();
        assert_eq!(pre.line_frequency(), None);

        let shape = pre.signal().shape();
        let before = pre.signal().data.clone();
        let filtered_shape = pre.notch(60.0).unwrap().shape();

        assert_eq!(filtered_shape, shape);
        assert_eq!(pre.line_frequency(), Some(60.0));
        assert_ne!(pre.signal().data, before);
    }

    #[test]
    fn test_notch_rejects_bad_frequency_without_mutating() {
        let mut pre = Preprocessor::standard(noisy_tone(500.0, 1000)).unwrap();
        let before = pre.signal().clone();

        assert!(matches!(pre.notch(0.0), Err(SqiError::InvalidParameter { .. })));
        assert!(pre.notch(300.0).is_err());
        assert_eq!(pre.signal(), &before);
        assert_eq!(pre.line_frequency(), None);
    }

    #[test]
    fn test_bandpass_preserves_shape() {
        let channels = vec![vec![1.0; 800], vec![2.0; 800]];
        let signal = EcgSignal::from_channels(channels, 360.0).unwrap();
        let mut pre = Preprocessor::standard(signal).unwrap();

        assert_eq!(pre.bandpass().unwrap().shape(), (800, 2));
        assert_eq!(pre.into_signal().channel_count(), 2);
    }

    #[test]
    fn test_full_bandpass_keeps_in_band_tone() {
        let fs = 500.0;
        let data: Vec<f64> = (0..10_000)
            .map(|i| 0.8 + (2.0 * PI * 10.0 * i as f64 / fs).sin())
            .collect();
        let mut pre = Preprocessor::standard(EcgSignal::from_samples(data, fs).unwrap()).unwrap();
        let output = pre.bandpass().unwrap().channel_data(0).unwrap();

        assert!(output.iter().all(|v| v.is_finite()));
        let middle = &output[2500..7500];
        let peak = middle.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        assert!((peak - 1.0).abs() < 0.1, "10 Hz tone peak {}", peak);
        let mean = middle.iter().sum::<f64>() / middle.len() as f64;
        assert!(mean.abs() < 0.05, "offset {}", mean);
    }

    #[test]
    fn test_full_bandpass_keeps_ecg_beats() {
        use ecg_simulation::{EcgConfig, EcgSimulator};

        let fs = 360.0;
        let config = EcgConfig {
            sampling_rate: fs,
            channel_count: 2,
            seed: Some(11),
            ..EcgConfig::default()
        };
        let sim = EcgSimulator::new(config).unwrap().generate(20.0).unwrap();

        let mut pre = Preprocessor::standard(sim.signal).unwrap();
        pre.notch(50.0).unwrap();
        let filtered = pre.bandpass().unwrap();
        assert!(filtered.data.iter().all(|v| v.is_finite()));

        for record in pre.score(Some(&sim.r_peaks)).unwrap() {
            assert!(record.f1 > 0.9, "F1 against true beats {}", record.f1);
        }
        for score in pre.bsqi(None).unwrap() {
            assert!(score > 0.9, "bsqi {}", score);
        }
    }

    #[test]
    fn test_bsqi_with_custom_detectors() {
        let every_second = |channel: &[f64], fs: f64| -> SqiResult<PeakSequence> {
            Ok((0..channel.len()).step_by(fs as usize).collect())
        };
        let signal = EcgSignal::from_channels(vec![vec![0.0; 1000], vec![0.0; 1000]], 100.0).unwrap();
        let pre = Preprocessor::standard(signal)
            .unwrap()
            .with_detectors(
                Box::new(FnDetector::new("a", every_second)),
                Box::new(FnDetector::new("b", every_second)),
            )
            .unwrap();

        assert_eq!(pre.bsqi(None).unwrap(), vec![1.0, 1.0]);

        let reference = PeakSequence::new(vec![0, 100, 200, 300, 400]);
        let records = pre.score(Some(&reference)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].se, 1.0);
        assert_eq!(records[0].ppv, 0.5);
    }
}
