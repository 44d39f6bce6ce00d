//! EcgSignal: owned container for multi-channel ECG samples

use crate::ecg_types::EcgMetadata;
use crate::error::{SqiError, SqiResult};
use crate::shape_error;
use uuid::Uuid;

/// Multi-channel ECG recording with shape (samples, channels)
#[derive(Debug, Clone, PartialEq)]
pub struct EcgSignal {
    /// Unique identifier for this recording
    pub id: Uuid,
    /// Sample data, interleaved row-major: [s0c0, s0c1, s1c0, s1c1, ...]
    pub data: Vec<f64>,
    /// Signal metadata
    pub metadata: EcgMetadata,
}

impl EcgSignal {
    /// Create new signal from interleaved data and metadata
    pub fn new(data: Vec<f64>, metadata: EcgMetadata) -> SqiResult<Self> {
        EcgMetadata::validate_sampling_rate(metadata.sampling_rate)?;
        EcgMetadata::validate_channel_count(metadata.channel_count)?;

        if data.is_empty() {
            return Err(shape_error!("signal must contain at least one sample"));
        }
        if data.len() % metadata.channel_count != 0 {
            return Err(shape_error!(
                "data length {} is not a multiple of {} channels",
                data.len(),
                metadata.channel_count
            ));
        }

        Ok(EcgSignal {
            id: Uuid::new_v4(),
            data,
            metadata,
        })
    }

    /// Single-channel signal from a 1-D sample array
    pub fn from_samples(samples: Vec<f64>, sampling_rate: f64) -> SqiResult<Self> {
        let metadata = EcgMetadata::new(sampling_rate, 1)?;
        Self::new(samples, metadata)
    }

    /// Signal from channel-major columns; every column must be equally long
    pub fn from_channels(channels: Vec<Vec<f64>>, sampling_rate: f64) -> SqiResult<Self> {
        let metadata = EcgMetadata::new(sampling_rate, channels.len())?;
        let samples = channels[0].len();

        if let Some((index, ragged)) = channels
            .iter()
            .enumerate()
            .find(|(_, channel)| channel.len() != samples)
        {
            return Err(shape_error!(
                "channel {} has {} samples, expected {}",
                index,
                ragged.len(),
                samples
            ));
        }

        let mut data = Vec::with_capacity(samples * channels.len());
        for sample_idx in 0..samples {
            for channel in &channels {
                data.push(channel[sample_idx]);
            }
        }

        Self::new(data, metadata)
    }

    /// Signal from sample-major rows of shape (samples, channels)
    pub fn from_rows(rows: Vec<Vec<f64>>, sampling_rate: f64) -> SqiResult<Self> {
        let width = rows.first().map(Vec::len).ok_or_else(|| {
            shape_error!("signal must contain at least one sample")
        })?;

        if let Some((index, ragged)) = rows.iter().enumerate().find(|(_, row)| row.len() != width) {
            return Err(shape_error!(
                "row {} has {} columns, expected {}",
                index,
                ragged.len(),
                width
            ));
        }

        let metadata = EcgMetadata::new(sampling_rate, width)?;
        Self::new(rows.into_iter().flatten().collect(), metadata)
    }

    /// Total number of values across all channels
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the signal holds no samples
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of samples per channel
    pub fn samples_per_channel(&self) -> usize {
        self.data.len() / self.metadata.channel_count
    }

    /// Shape as (samples, channels)
    pub fn shape(&self) -> (usize, usize) {
        (self.samples_per_channel(), self.metadata.channel_count)
    }

    /// Copy out the samples of one channel
    pub fn channel_data(&self, channel_index: usize) -> SqiResult<Vec<f64>> {
        let channel_count = self.metadata.channel_count;
        if channel_index >= channel_count {
            return Err(SqiError::ChannelOutOfRange {
                index: channel_index,
                channel_count,
            });
        }

        Ok(self
            .data
            .iter()
            .skip(channel_index)
            .step_by(channel_count)
            .copied()
            .collect())
    }

    /// All channels as separate vectors
    pub fn all_channels(&self) -> SqiResult<Vec<Vec<f64>>> {
        (0..self.metadata.channel_count)
            .map(|ch| self.channel_data(ch))
            .collect()
    }

    /// Overwrite all channels, keeping the shape unchanged
    pub fn replace_channels(&mut self, channels: Vec<Vec<f64>>) -> SqiResult<()> {
        let (samples, channel_count) = self.shape();
        if channels.len() != channel_count {
            return Err(shape_error!(
                "expected {} channels, got {}",
                channel_count,
                channels.len()
            ));
        }
        if let Some(ragged) = channels.iter().find(|channel| channel.len() != samples) {
            return Err(shape_error!(
                "expected {} samples per channel, got {}",
                samples,
                ragged.len()
            ));
        }

        for (channel_idx, channel) in channels.iter().enumerate() {
            for (sample_idx, value) in channel.iter().enumerate() {
                self.data[sample_idx * channel_count + channel_idx] = *value;
            }
        }
        Ok(())
    }

    /// Recording duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples_per_channel() as f64 / self.metadata.sampling_rate
    }

    /// Sampling rate in Hz
    pub fn sampling_rate(&self) -> f64 {
        self.metadata.sampling_rate
    }

    /// Channel count
    pub fn channel_count(&self) -> usize {
        self.metadata.channel_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_channel_from_samples() {
        let signal = EcgSignal::from_samples(vec![0.0; 1000], 500.0).unwrap();

        assert_eq!(signal.shape(), (1000, 1));
        assert_eq!(signal.channel_count(), 1);
        assert!((signal.duration() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_multichannel_interleaving() {
        let channels = vec![vec![0.0, 2.0, 4.0], vec![1.0, 3.0, 5.0]];
        let signal = EcgSignal::from_channels(channels, 250.0).unwrap();

        // Interleaved: [ch0_s0, ch1_s0, ch0_s1, ch1_s1, ...]
        assert_eq!(signal.data, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(signal.channel_data(0).unwrap(), vec![0.0, 2.0, 4.0]);
        assert_eq!(signal.channel_data(1).unwrap(), vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_rows_match_channels() {
        let rows = vec![vec![0.0, 1.0], vec![2.0, 3.0], vec![4.0, 5.0]];
        let from_rows = EcgSignal::from_rows(rows, 250.0).unwrap();
        let from_channels =
            EcgSignal::from_channels(vec![vec![0.0, 2.0, 4.0], vec![1.0, 3.0, 5.0]], 250.0)
                .unwrap();

        assert_eq!(from_rows.data, from_channels.data);
        assert_eq!(from_rows.shape(), (3, 2));
    }

    #[test]
    fn test_shape_errors() {
        assert!(matches!(
            EcgSignal::from_samples(vec![], 500.0),
            Err(SqiError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            EcgSignal::from_channels(vec![vec![1.0, 2.0], vec![1.0]], 500.0),
            Err(SqiError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            EcgSignal::from_rows(vec![vec![1.0, 2.0], vec![1.0]], 500.0),
            Err(SqiError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            EcgSignal::from_channels(vec![], 500.0),
            Err(SqiError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            EcgSignal::from_samples(vec![1.0], -1.0),
            Err(SqiError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_channel_out_of_range() {
        let signal = EcgSignal::from_samples(vec![1.0, 2.0], 100.0).unwrap();
        assert_eq!(
            signal.channel_data(1),
            Err(SqiError::ChannelOutOfRange { index: 1, channel_count: 1 })
        );
    }

    #[test]
    fn test_replace_channels_preserves_shape() {
        let mut signal =
            EcgSignal::from_channels(vec![vec![1.0, 2.0], vec![3.0, 4.0]], 100.0).unwrap();
        let id = signal.id;

        signal
            .replace_channels(vec![vec![10.0, 20.0], vec![30.0, 40.0]])
            .unwrap();
        assert_eq!(signal.data, vec![10.0, 30.0, 20.0, 40.0]);
        assert_eq!(signal.id, id);

        assert!(signal.replace_channels(vec![vec![1.0, 2.0]]).is_err());
        assert!(signal.replace_channels(vec![vec![1.0], vec![2.0]]).is_err());
    }
}
