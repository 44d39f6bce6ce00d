//! Core signal processor trait and timing helpers

use ecg_core::{EcgSignal, SqiResult};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Core trait for whole-record signal transforms
///
/// Processors are stateless between calls: every invocation sees the full
/// record, which is what zero-phase filtering needs.
pub trait SignalProcessor: Send + Sync {
    /// Process a signal and return the transformed copy (same shape)
    fn process(&self, input: &EcgSignal) -> SqiResult<EcgSignal>;

    /// Get processor name/identifier
    fn name(&self) -> &str;
}

/// Timing metrics for a processing operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetrics {
    /// Stage name
    pub stage: String,
    /// Actual processing time in microseconds
    pub processing_time_us: u64,
    /// Number of channels processed
    pub channels: usize,
    /// Samples per channel processed
    pub samples: usize,
}

impl ProcessingMetrics {
    /// Start timing a processing operation
    pub fn start_timing(stage: &str) -> ProcessingTimer {
        ProcessingTimer {
            start_time: Instant::now(),
            stage: stage.to_string(),
        }
    }
}

/// Helper for timing processing operations
pub struct ProcessingTimer {
    start_time: Instant,
    stage: String,
}

impl ProcessingTimer {
    /// Finish timing, log the result at debug level and return metrics
    pub fn finish(self, channels: usize, samples: usize) -> ProcessingMetrics {
        let metrics = ProcessingMetrics {
            stage: self.stage,
            processing_time_us: self.start_time.elapsed().as_micros() as u64,
            channels,
            samples,
        };
        tracing::debug!(
            stage = %metrics.stage,
            elapsed_us = metrics.processing_time_us,
            channels,
            samples,
            "stage finished"
        );
        metrics
    }
}
