//! ECG-specific lead labels and signal metadata

use serde::{Deserialize, Serialize};
use crate::error::{SqiError, SqiResult};

/// Standard ECG lead labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lead {
    I,
    II,
    III,
    AVR,
    AVL,
    AVF,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    Other(u8), // Unlabelled or non-standard leads
}

impl Lead {
    /// The twelve standard leads in conventional order
    pub fn standard_twelve() -> [Lead; 12] {
        [
            Lead::I, Lead::II, Lead::III,
            Lead::AVR, Lead::AVL, Lead::AVF,
            Lead::V1, Lead::V2, Lead::V3, Lead::V4, Lead::V5, Lead::V6,
        ]
    }

    /// Placeholder labels for `count` channels of unknown montage
    pub fn unlabelled(count: usize) -> Vec<Lead> {
        (0..count).map(|i| Lead::Other(i.min(u8::MAX as usize) as u8)).collect()
    }
}

/// ECG signal metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgMetadata {
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Number of channels
    pub channel_count: usize,
    /// Lead label per channel
    pub leads: Vec<Lead>,
    /// Power-line frequency last removed by a notch filter (Hz)
    pub line_frequency: Option<f64>,
}

impl EcgMetadata {
    /// Create new ECG metadata with unlabelled leads
    pub fn new(sampling_rate: f64, channel_count: usize) -> SqiResult<Self> {
        Self::validate_sampling_rate(sampling_rate)?;
        Self::validate_channel_count(channel_count)?;

        Ok(EcgMetadata {
            sampling_rate,
            channel_count,
            leads: Lead::unlabelled(channel_count),
            line_frequency: None,
        })
    }

    /// Attach lead labels, one per channel
    pub fn with_leads(mut self, leads: Vec<Lead>) -> SqiResult<Self> {
        if leads.len() != self.channel_count {
            return Err(SqiError::ShapeMismatch {
                reason: format!(
                    "{} lead labels supplied for {} channels",
                    leads.len(),
                    self.channel_count
                ),
            });
        }
        self.leads = leads;
        Ok(self)
    }

    /// Sampling rate must be finite and strictly positive
    pub fn validate_sampling_rate(rate: f64) -> SqiResult<()> {
        if !rate.is_finite() || rate <= 0.0 {
            Err(SqiError::not_positive("sampling_rate", rate))
        } else {
            Ok(())
        }
    }

    /// At least one channel is required
    pub fn validate_channel_count(count: usize) -> SqiResult<()> {
        if count == 0 {
            Err(SqiError::ShapeMismatch {
                reason: "signal must have at least one channel".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Lead label of a channel, falling back to an unlabelled tag
    pub fn lead(&self, channel: usize) -> Lead {
        self.leads
            .get(channel)
            .copied()
            .unwrap_or(Lead::Other(channel.min(u8::MAX as usize) as u8))
    }
}

impl std::fmt::Display for Lead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lead::I => write!(f, "I"),
            Lead::II => write!(f, "II"),
            Lead::III => write!(f, "III"),
            Lead::AVR => write!(f, "aVR"),
            Lead::AVL => write!(f, "aVL"),
            Lead::AVF => write!(f, "aVF"),
            Lead::V1 => write!(f, "V1"),
            Lead::V2 => write!(f, "V2"),
            Lead::V3 => write!(f, "V3"),
            Lead::V4 => write!(f, "V4"),
            Lead::V5 => write!(f, "V5"),
            Lead::V6 => write!(f, "V6"),
            Lead::Other(id) => write!(f, "ch{}", id),
        }
    }
}
