//! Fiducial point sequences

use serde::{Deserialize, Serialize};

/// Ordered sample indices of detected fiducial points (e.g. R-peaks)
///
/// Detectors are expected to emit strictly increasing indices; this is
/// not enforced here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeakSequence(Vec<usize>);

impl PeakSequence {
    pub fn new(indices: Vec<usize>) -> Self {
        PeakSequence(indices)
    }

    /// Sort and drop duplicate indices
    pub fn normalized(mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        PeakSequence(indices)
    }

    pub fn empty() -> Self {
        PeakSequence(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &usize> {
        self.0.iter()
    }

    /// True if every index is larger than its predecessor
    pub fn is_strictly_increasing(&self) -> bool {
        self.0.windows(2).all(|w| w[0] < w[1])
    }

    /// Intervals between consecutive peaks in seconds
    pub fn rr_intervals(&self, sampling_rate: f64) -> Vec<f64> {
        self.0
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64) / sampling_rate)
            .collect()
    }
}

impl From<Vec<usize>> for PeakSequence {
    fn from(indices: Vec<usize>) -> Self {
        PeakSequence(indices)
    }
}

impl FromIterator<usize> for PeakSequence {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        PeakSequence(iter.into_iter().collect())
    }
}
