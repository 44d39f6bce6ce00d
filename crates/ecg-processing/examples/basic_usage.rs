//! Basic usage: simulate a recording, filter it and score detector agreement
//!
//! Run with `cargo run -p ecg-processing --example basic_usage`.

use ecg_core::SqiResult;
use ecg_processing::{summarize, Preprocessor, SqiConfig};
use ecg_simulation::{EcgConfig, EcgSimulator, NoiseConfig, RhythmPattern};

fn main() -> SqiResult<()> {
    println!("=== ECG bSQI Basic Usage ===\n");

    let config = EcgConfig {
        sampling_rate: 360.0,
        channel_count: 3,
        heart_rate_bpm: 68.0,
        rhythm: RhythmPattern::Irregular { rr_jitter: 0.05 },
        noise: NoiseConfig::default(),
        powerline_freq: Some(60.0),
        seed: Some(2024),
    };
    let simulated = EcgSimulator::new(config)?.generate(30.0)?;
    println!(
        "Simulated {} leads x {} samples, {} true beats",
        simulated.signal.channel_count(),
        simulated.signal.samples_per_channel(),
        simulated.r_peaks.len()
    );

    let mut preprocessor = Preprocessor::new(simulated.signal, SqiConfig::standard())?;
    preprocessor.notch(60.0)?;
    preprocessor.bandpass()?;

    // detector agreement, then the test detector against the true beats
    let detector_agreement = preprocessor.bsqi(None)?;
    let truth_records = preprocessor.score(Some(&simulated.r_peaks))?;

    for (channel, (bsqi, record)) in detector_agreement.iter().zip(&truth_records).enumerate() {
        println!(
            "  {}: bSQI {:.3} | vs truth Se {:.3} PPV {:.3} timing {:?}",
            preprocessor.signal().metadata.lead(channel),
            bsqi,
            record.se,
            record.ppv,
            record.mean_timing_error
        );
    }

    let summary = summarize(&[("bsqi", detector_agreement.into_iter().map(Some).collect())]);
    for (name, stats) in summary.iter() {
        println!("\n{}: {:?}", name, stats);
    }
    Ok(())
}
