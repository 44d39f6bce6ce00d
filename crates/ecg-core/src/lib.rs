//! ECG-Core: Foundation types for ECG signal quality estimation
//!
//! Signal holder, metadata, fiducial point sequences and the shared error type.

pub mod signal_entity;
pub mod ecg_types;
pub mod peaks;
pub mod error;

pub use signal_entity::*;
pub use ecg_types::*;
pub use peaks::PeakSequence;
pub use error::{SqiError, SqiResult};
