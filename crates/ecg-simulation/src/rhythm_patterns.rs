//! Beat timing patterns for synthetic ECG

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Shortest and longest RR interval a jittered rhythm may produce (s)
const MIN_RR: f64 = 0.25;
const MAX_RR: f64 = 3.0;

/// Cardiac rhythm used to place beats
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RhythmPattern {
    /// Constant RR interval
    Regular,
    /// RR interval drawn around the mean with relative standard deviation `rr_jitter`
    Irregular { rr_jitter: f64 },
    /// No beats at all
    Asystole,
}

impl RhythmPattern {
    /// Beat (R-peak) times in seconds within `[0, duration)`
    ///
    /// The first beat sits half an RR interval in so its P wave is on record.
    pub fn beat_times<R: Rng>(&self, heart_rate_bpm: f64, duration: f64, rng: &mut R) -> Vec<f64> {
        let mean_rr = 60.0 / heart_rate_bpm;
        let jitter = match self {
            RhythmPattern::Asystole => return Vec::new(),
            RhythmPattern::Regular => None,
            RhythmPattern::Irregular { rr_jitter } => Normal::new(0.0, rr_jitter.abs()).ok(),
        };

        let mut times = Vec::new();
        let mut t = 0.5 * mean_rr;
        while t < duration {
            times.push(t);
            let rr = match &jitter {
                Some(dist) => mean_rr * (1.0 + dist.sample(rng)),
                None => mean_rr,
            };
            t += rr.clamp(MIN_RR, MAX_RR);
        }
        times
    }

    pub fn description(&self) -> &'static str {
        match self {
            RhythmPattern::Regular => "Regular sinus rhythm",
            RhythmPattern::Irregular { .. } => "Irregular rhythm",
            RhythmPattern::Asystole => "Asystole",
        }
    }

    /// Common presets
    pub fn presets() -> Vec<(&'static str, RhythmPattern)> {
        vec![
            ("Sinus", RhythmPattern::Regular),
            ("Sinus Arrhythmia", RhythmPattern::Irregular { rr_jitter: 0.05 }),
            ("Atrial Fibrillation", RhythmPattern::Irregular { rr_jitter: 0.2 }),
            ("Flatline", RhythmPattern::Asystole),
        ]
    }
}
