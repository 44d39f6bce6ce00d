//! ECG-Processing: filtering, R-peak detection and bsqi agreement scoring
//!
//! Zero-phase notch and band-pass filters, two interchangeable fiducial
//! detectors, nearest-neighbour peak matching, F1-based quality scoring per
//! channel and a descriptive-statistics reducer.

pub mod butterworth;
pub mod filters;
pub mod processor;
pub mod config;
pub mod detectors;
pub mod matcher;
pub mod scorer;
pub mod orchestrator;
pub mod preprocessing;
pub mod statistics;

pub use processor::{SignalProcessor, ProcessingMetrics};
pub use butterworth::{BandShape, SosFilter};
pub use filters::{FilterType, NotchFilter, BandpassFilter, BandpassDesign};
pub use config::{SqiConfig, BandpassSettings, NotchSettings, DetectorSettings};
pub use detectors::{
    FiducialDetector, DetectorKind, FnDetector, PanTompkinsDetector, WaveletDetector
};
pub use matcher::{match_peaks, Match, ReferenceIndex};
pub use scorer::{score_peaks, ConfusionCounts, ScoreRecord, ToleranceWindow};
pub use orchestrator::ChannelOrchestrator;
pub use preprocessing::Preprocessor;
pub use statistics::{
    describe, from_sentinel, summarize, DescriptiveStats, StatisticsReport, MISSING_SENTINEL
};
