//! Configuration management for signal quality estimation

use crate::detectors::DetectorKind;
use ecg_core::{SqiError, SqiResult};
use serde::{Deserialize, Serialize};

/// Default matching tolerance in seconds
pub const DEFAULT_WINDOW_SECONDS: f64 = 0.05;
/// Default band-pass edges in Hz
pub const DEFAULT_LOW_CUTOFF: f64 = 0.67;
pub const DEFAULT_HIGH_CUTOFF: f64 = 100.0;
/// Default band-pass Butterworth order
pub const DEFAULT_BANDPASS_ORDER: usize = 75;
/// Default notch quality factor
pub const DEFAULT_NOTCH_Q: f64 = 30.0;

/// Global quality-estimation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqiConfig {
    /// Configuration name/profile
    pub name: String,
    /// Peak matching tolerance in seconds
    pub window_seconds: f64,
    /// Band-pass filter settings
    pub bandpass: BandpassSettings,
    /// Notch filter settings
    pub notch: NotchSettings,
    /// Detector selection
    pub detectors: DetectorSettings,
    /// Score channels on worker threads
    pub parallel_channels: bool,
}

/// Band-pass filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandpassSettings {
    /// Lower pass-band edge (Hz)
    pub low_cutoff: f64,
    /// Upper pass-band edge (Hz)
    pub high_cutoff: f64,
    /// Butterworth order
    pub order: usize,
}

/// Notch filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotchSettings {
    /// Quality factor (centre frequency / bandwidth)
    pub q_factor: f64,
}

/// Detector selection for the two scoring roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorSettings {
    /// Detector producing the reference annotation
    pub reference: DetectorKind,
    /// Detector under test
    pub test: DetectorKind,
}

impl SqiConfig {
    /// Standard bsqi configuration
    pub fn standard() -> Self {
        SqiConfig {
            name: "Standard bSQI".to_string(),
            window_seconds: DEFAULT_WINDOW_SECONDS,
            bandpass: BandpassSettings::default(),
            notch: NotchSettings::default(),
            detectors: DetectorSettings::default(),
            parallel_channels: false,
        }
    }

    /// Same configuration with channel-parallel scoring switched on or off
    pub fn with_parallel_channels(mut self, parallel: bool) -> Self {
        self.parallel_channels = parallel;
        self
    }

    /// Validate entire configuration
    pub fn validate(&self) -> SqiResult<()> {
        if !self.window_seconds.is_finite() || self.window_seconds <= 0.0 {
            return Err(SqiError::ConfigurationError {
                message: format!("window must be positive, got {} s", self.window_seconds),
            });
        }

        let bp = &self.bandpass;
        if !bp.low_cutoff.is_finite() || bp.low_cutoff <= 0.0 {
            return Err(SqiError::ConfigurationError {
                message: format!("band-pass low cutoff must be positive, got {} Hz", bp.low_cutoff),
            });
        }
        if !bp.high_cutoff.is_finite() || bp.high_cutoff <= bp.low_cutoff {
            return Err(SqiError::ConfigurationError {
                message: format!(
                    "band-pass high cutoff {} Hz must exceed low cutoff {} Hz",
                    bp.high_cutoff, bp.low_cutoff
                ),
            });
        }
        if bp.order == 0 {
            return Err(SqiError::ConfigurationError {
                message: "band-pass order must be at least 1".to_string(),
            });
        }

        if !self.notch.q_factor.is_finite() || self.notch.q_factor <= 0.0 {
            return Err(SqiError::ConfigurationError {
                message: format!("notch Q must be positive, got {}", self.notch.q_factor),
            });
        }

        Ok(())
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> SqiResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SqiError::ConfigurationError {
            message: format!("Failed to serialize configuration: {}", e),
        })
    }

    /// Import and validate configuration from JSON
    pub fn from_json(json: &str) -> SqiResult<Self> {
        let config: SqiConfig =
            serde_json::from_str(json).map_err(|e| SqiError::ConfigurationError {
                message: format!("Failed to deserialize configuration: {}", e),
            })?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for SqiConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl Default for BandpassSettings {
    fn default() -> Self {
        BandpassSettings {
            low_cutoff: DEFAULT_LOW_CUTOFF,
            high_cutoff: DEFAULT_HIGH_CUTOFF,
            order: DEFAULT_BANDPASS_ORDER,
        }
    }
}

impl Default for NotchSettings {
    fn default() -> Self {
        NotchSettings { q_factor: DEFAULT_NOTCH_Q }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        DetectorSettings {
            reference: DetectorKind::PanTompkins,
            test: DetectorKind::Wavelet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_config() {
        let config = SqiConfig::standard();
        assert_eq!(config.window_seconds, 0.05);
        assert_eq!(config.bandpass.order, 75);
        assert_eq!(config.bandpass.low_cutoff, 0.67);
        assert_eq!(config.bandpass.high_cutoff, 100.0);
        assert!(!config.parallel_channels);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SqiConfig::standard();

        config.window_seconds = 0.0;
        assert!(config.validate().is_err());

        config = SqiConfig::standard();
        config.bandpass.high_cutoff = 0.5;
        assert!(config.validate().is_err());

        config = SqiConfig::standard();
        config.bandpass.order = 0;
        assert!(config.validate().is_err());

        config = SqiConfig::standard();
        config.notch.q_factor = -3.0;
        assert!(matches!(
            config.validate(),
            Err(SqiError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_json_serialization() {
        let config = SqiConfig::standard().with_parallel_channels(true);

        let json = config.to_json().unwrap();
        assert!(json.contains("window_seconds"));

        let deserialized = SqiConfig::from_json(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(SqiConfig::from_json("{ not json").is_err());

        let mut config = SqiConfig::standard();
        config.window_seconds = -1.0;
        let json = serde_json::to_string(&config).unwrap();
        assert!(SqiConfig::from_json(&json).is_err());
    }
}
