//! Error handling for the ECG quality framework
//!
//! Parameter and shape problems are raised eagerly at the API boundary.
//! Degenerate scoring situations (empty peak sets, no matches) are values,
//! not errors, and never show up here.

use core::fmt;

/// Result type alias for ECG framework operations
pub type SqiResult<T> = Result<T, SqiError>;

/// Error type for all ECG framework operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SqiError {
    /// A numeric parameter is outside its valid domain
    InvalidParameter {
        /// Name of the offending parameter
        parameter: &'static str,
        /// Value that was supplied
        value: f64,
        /// Human readable constraint
        reason: &'static str,
    },

    /// Signal array does not have the expected shape
    ShapeMismatch {
        /// Description of the shape problem
        reason: String,
    },

    /// Channel index past the end of the signal
    ChannelOutOfRange {
        /// Requested channel
        index: usize,
        /// Channels available
        channel_count: usize,
    },

    /// Nearest-neighbour query against an empty reference set
    EmptyReference,

    /// Filter coefficients could not be designed
    FilterDesign {
        /// Description of the design failure
        reason: String,
    },

    /// A fiducial detector could not process a channel
    DetectorFailure {
        /// Detector name
        detector: String,
        /// Failure description
        reason: String,
    },

    /// Invalid or unparsable configuration
    ConfigurationError {
        /// Description of the configuration problem
        message: String,
    },
}

impl SqiError {
    /// Shorthand for a strictly-positive parameter violation
    pub fn not_positive(parameter: &'static str, value: f64) -> Self {
        SqiError::InvalidParameter {
            parameter,
            value,
            reason: "must be strictly positive",
        }
    }
}

impl fmt::Display for SqiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqiError::InvalidParameter { parameter, value, reason } => {
                write!(f, "Invalid parameter {}: {} ({})", parameter, value, reason)
            }
            SqiError::ShapeMismatch { reason } => {
                write!(f, "Signal shape mismatch: {}", reason)
            }
            SqiError::ChannelOutOfRange { index, channel_count } => {
                write!(f, "Channel index {} out of range for {} channel(s)",
                       index, channel_count)
            }
            SqiError::EmptyReference => {
                write!(f, "Reference peak set is empty")
            }
            SqiError::FilterDesign { reason } => {
                write!(f, "Filter design error: {}", reason)
            }
            SqiError::DetectorFailure { detector, reason } => {
                write!(f, "Detector {} failed: {}", detector, reason)
            }
            SqiError::ConfigurationError { message } => {
                write!(f, "Configuration error: {}", message)
            }
        }
    }
}

impl std::error::Error for SqiError {}

/// Convenience macro for creating shape errors
#[macro_export]
macro_rules! shape_error {
    ($($arg:tt)+) => {
        $crate::error::SqiError::ShapeMismatch {
            reason: format!($($arg)+),
        }
    };
}
