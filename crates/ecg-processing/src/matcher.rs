//! Nearest-neighbour matching of test peaks against reference peaks

use ecg_core::{SqiError, SqiResult};
use serde::{Deserialize, Serialize};

/// Nearest reference peak for one test peak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Position of the test peak in the test sequence
    pub test_index: usize,
    /// Position of the nearest peak in the reference sequence
    pub reference_index: usize,
    /// Absolute distance in samples
    pub distance: usize,
}

/// Sorted 1-D index over reference sample positions
///
/// Each distinct position keeps the smallest original index it appeared at,
/// so equal-distance ties resolve to the lower reference index.
#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    entries: Vec<(usize, usize)>,
}

impl ReferenceIndex {
    pub fn new(reference: &[usize]) -> Self {
        let mut entries: Vec<(usize, usize)> = reference
            .iter()
            .enumerate()
            .map(|(original, &sample)| (sample, original))
            .collect();
        entries.sort_unstable();
        entries.dedup_by_key(|(sample, _)| *sample);
        ReferenceIndex { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nearest reference `(original index, distance)` for `sample`
    pub fn nearest(&self, sample: usize) -> Option<(usize, usize)> {
        let pos = self.entries.partition_point(|&(value, _)| value < sample);

        let below = pos
            .checked_sub(1)
            .map(|i| self.entries[i])
            .map(|(value, original)| (original, sample - value));
        let above = self
            .entries
            .get(pos)
            .map(|&(value, original)| (original, value - sample));

        match (below, above) {
            (Some(b), Some(a)) => {
                if (b.1, b.0) <= (a.1, a.0) {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (b, a) => b.or(a),
        }
    }
}

/// Match every test peak to its nearest reference peak
///
/// Distances are recorded regardless of any tolerance; windowing happens
/// in the scorer. An empty reference cannot answer queries.
pub fn match_peaks(reference: &[usize], test: &[usize]) -> SqiResult<Vec<Match>> {
    let index = ReferenceIndex::new(reference);
    if index.is_empty() {
        return Err(SqiError::EmptyReference);
    }

    test.iter()
        .enumerate()
        .map(|(test_index, &sample)| {
            index
                .nearest(sample)
                .map(|(reference_index, distance)| Match {
                    test_index,
                    reference_index,
                    distance,
                })
                .ok_or(SqiError::EmptyReference)
        })
        .collect()
}
