//! Per-channel detection, matching and scoring

use crate::config::SqiConfig;
use crate::detectors::FiducialDetector;
use crate::processor::ProcessingMetrics;
use crate::scorer::{score_peaks, ScoreRecord, ToleranceWindow};
use ecg_core::{EcgSignal, PeakSequence, SqiError, SqiResult};
use rayon::prelude::*;

/// Runs the reference and test detectors over every channel and scores
/// their agreement
pub struct ChannelOrchestrator {
    reference: Box<dyn FiducialDetector>,
    test: Box<dyn FiducialDetector>,
    window: ToleranceWindow,
    parallel: bool,
}

impl ChannelOrchestrator {
    pub fn new(
        reference: Box<dyn FiducialDetector>,
        test: Box<dyn FiducialDetector>,
        window: ToleranceWindow,
    ) -> Self {
        ChannelOrchestrator {
            reference,
            test,
            window,
            parallel: false,
        }
    }

    /// Build detectors and window from a validated configuration
    pub fn from_config(config: &SqiConfig) -> SqiResult<Self> {
        config.validate()?;
        let window = ToleranceWindow::new(config.window_seconds)?;
        Ok(Self::new(
            config.detectors.reference.build(),
            config.detectors.test.build(),
            window,
        )
        .with_parallel(config.parallel_channels))
    }

    /// Score channels on the rayon pool
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn window(&self) -> ToleranceWindow {
        self.window
    }

    fn score_channel(
        &self,
        channel_index: usize,
        channel: &[f64],
        sampling_rate: f64,
        reference: Option<&PeakSequence>,
    ) -> SqiResult<ScoreRecord> {
        let detected;
        let reference = match reference {
            Some(peaks) => peaks,
            None => {
                detected = self.reference.detect(channel, sampling_rate)?;
                &detected
            }
        };
        let test = self.test.detect(channel, sampling_rate)?;

        let record = score_peaks(reference.as_slice(), test.as_slice(), self.window, sampling_rate)?;
        tracing::debug!(
            channel = channel_index,
            reference_peaks = reference.len(),
            test_peaks = test.len(),
            f1 = record.f1,
            "channel scored"
        );
        Ok(record)
    }

    /// Full score record for every channel, in channel order
    ///
    /// A supplied `reference` is reused unchanged for every channel.
    pub fn score_channels(
        &self,
        signal: &EcgSignal,
        reference: Option<&PeakSequence>,
    ) -> SqiResult<Vec<ScoreRecord>> {
        let timer = ProcessingMetrics::start_timing("bsqi");
        let sampling_rate = signal.sampling_rate();
        let channels = signal.all_channels()?;

        let records = if self.parallel {
            channels
                .par_iter()
                .enumerate()
                .map(|(i, channel)| self.score_channel(i, channel, sampling_rate, reference))
                .collect::<SqiResult<Vec<_>>>()?
        } else {
            channels
                .iter()
                .enumerate()
                .map(|(i, channel)| self.score_channel(i, channel, sampling_rate, reference))
                .collect::<SqiResult<Vec<_>>>()?
        };

        timer.finish(signal.channel_count(), signal.samples_per_channel());
        Ok(records)
    }

    /// F1 agreement per channel
    pub fn bsqi(&self, signal: &EcgSignal, reference: Option<&PeakSequence>) -> SqiResult<Vec<f64>> {
        Ok(self
            .score_channels(signal, reference)?
            .into_iter()
            .map(|record| record.f1)
            .collect())
    }

    /// Score a single channel by index
    pub fn score_one(
        &self,
        signal: &EcgSignal,
        channel_index: usize,
        reference: Option<&PeakSequence>,
    ) -> SqiResult<ScoreRecord> {
        if channel_index >= signal.channel_count() {
            return Err(SqiError::ChannelOutOfRange {
                index: channel_index,
                channel_count: signal.channel_count(),
            });
        }
        let channel = signal.channel_data(channel_index)?;
        self.score_channel(channel_index, &channel, signal.sampling_rate(), reference)
    }
}

impl Default for ChannelOrchestrator {
    fn default() -> Self {
        let detectors = SqiConfig::standard().detectors;
        Self::new(
            detectors.reference.build(),
            detectors.test.build(),
            ToleranceWindow::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::FnDetector;

    fn fixed(name: &str, peaks: Vec<usize>) -> Box<dyn FiducialDetector> {
        Box::new(FnDetector::new(name, move |_: &[f64], _: f64| {
            Ok(PeakSequence::new(peaks.clone()))
        }))
    }

    /// Detector reporting samples whose value exceeds 0.5
    fn threshold_detector() -> Box<dyn FiducialDetector> {
        Box::new(FnDetector::new("threshold", |channel: &[f64], _: f64| {
            Ok(channel
                .iter()
                .enumerate()
                .filter(|&(_, &v)| v > 0.5)
                .map(|(i, _)| i)
                .collect())
        }))
    }

    fn spikes(len: usize, positions: &[usize]) -> Vec<f64> {
        let mut channel = vec![0.0; len];
        for &p in positions {
            channel[p] = 1.0;
        }
        channel
    }

    #[test]
    fn test_identical_detectors_score_one() {
        let signal = EcgSignal::from_channels(
            vec![spikes(1000, &[100, 400, 700]), spikes(1000, &[200, 500])],
            100.0,
        )
        .unwrap();
        let orchestrator =
            ChannelOrchestrator::new(threshold_detector(), threshold_detector(), ToleranceWindow::default());

        assert_eq!(orchestrator.bsqi(&signal, None).unwrap(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_zero_channel_does_not_stop_scoring() {
        // channel 0 has no beats at all, channel 1 agrees with the reference
        let signal = EcgSignal::from_channels(
            vec![vec![0.0; 1000], spikes(1000, &[100, 400, 700])],
            100.0,
        )
        .unwrap();
        let orchestrator = ChannelOrchestrator::new(
            fixed("reference", vec![100, 400, 700]),
            threshold_detector(),
            ToleranceWindow::default(),
        );

        assert_eq!(orchestrator.bsqi(&signal, None).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_supplied_reference_reused_for_every_channel() {
        let signal = EcgSignal::from_channels(
            vec![spikes(1000, &[100, 400]), spikes(1000, &[100, 400, 800])],
            100.0,
        )
        .unwrap();
        let orchestrator = ChannelOrchestrator::new(
            fixed("never_called", vec![]),
            threshold_detector(),
            ToleranceWindow::default(),
        );
        let reference = PeakSequence::new(vec![100, 400]);

        let records = orchestrator.score_channels(&signal, Some(&reference)).unwrap();
        assert_eq!(records[0].f1, 1.0);
        assert_eq!(records[1].counts.fp, 1);
        assert!((records[1].f1 - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_parallel_matches_sequential_and_is_idempotent() {
        let channels: Vec<Vec<f64>> = (0..6)
            .map(|ch| spikes(2000, &[100 + ch, 700, 1300 + 3 * ch]))
            .collect();
        let signal = EcgSignal::from_channels(channels, 250.0).unwrap();
        let reference = PeakSequence::new(vec![100, 700, 1300]);

        let sequential = ChannelOrchestrator::new(
            fixed("reference", vec![]),
            threshold_detector(),
            ToleranceWindow::default(),
        );
        let first = sequential.bsqi(&signal, Some(&reference)).unwrap();
        let second = sequential.bsqi(&signal, Some(&reference)).unwrap();
        assert_eq!(first, second);

        let parallel = sequential.with_parallel(true);
        assert_eq!(parallel.bsqi(&signal, Some(&reference)).unwrap(), first);
    }

    #[test]
    fn test_detector_error_propagates() {
        let failing: Box<dyn FiducialDetector> = Box::new(FnDetector::new("failing", |_: &[f64], _: f64| {
            Err(SqiError::DetectorFailure {
                detector: "failing".to_string(),
                reason: "boom".to_string(),
            })
        }));
        let signal = EcgSignal::from_samples(vec![0.0; 100], 100.0).unwrap();
        let orchestrator = ChannelOrchestrator::new(failing, threshold_detector(), ToleranceWindow::default());
        assert!(matches!(
            orchestrator.bsqi(&signal, None),
            Err(SqiError::DetectorFailure { .. })
        ));
    }

    #[test]
    fn test_sampling_rate_below_qrs_band_scores_zero() {
        let signal = EcgSignal::from_samples(spikes(100, &[20, 60]), 10.0).unwrap();
        let scores = ChannelOrchestrator::default().bsqi(&signal, None).unwrap();
        assert_eq!(scores, vec![0.0]);
    }

    #[test]
    fn test_score_one_checks_range() {
        let signal = EcgSignal::from_samples(spikes(500, &[100]), 100.0).unwrap();
        let orchestrator = ChannelOrchestrator::default();
        assert!(matches!(
            orchestrator.score_one(&signal, 3, None),
            Err(SqiError::ChannelOutOfRange { index: 3, channel_count: 1 })
        ));
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = SqiConfig::standard();
        config.window_seconds = -0.1;
        assert!(ChannelOrchestrator::from_config(&config).is_err());

        let orchestrator = ChannelOrchestrator::from_config(&SqiConfig::standard()).unwrap();
        assert_eq!(orchestrator.window().seconds(), 0.05);
    }
}
