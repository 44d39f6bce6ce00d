//! ECG-Simulation: synthetic ECG generation with ground-truth R-peaks
//!
//! Provides reproducible multi-lead recordings for testing and development.

pub mod rhythm_patterns;
pub mod ecg_simulator;

pub use ecg_simulator::*;
pub use rhythm_patterns::*;
