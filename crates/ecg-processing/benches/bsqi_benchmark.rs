//! Performance benchmarks for filtering, matching and scoring

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ecg_processing::{
    match_peaks, score_peaks, BandpassFilter, ChannelOrchestrator, NotchFilter, NotchSettings,
    SignalProcessor, ToleranceWindow,
};
use ecg_simulation::{EcgConfig, EcgSimulator, SimulatedEcg};

fn simulate(channels: usize, duration: f64) -> SimulatedEcg {
    let config = EcgConfig {
        channel_count: channels,
        seed: Some(11),
        ..EcgConfig::default()
    };
    EcgSimulator::new(config).unwrap().generate(duration).unwrap()
}

/// Zero-phase filters over a 10 s recording
fn bench_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("filters");
    let sim = simulate(2, 10.0);

    let notch = NotchFilter::new(50.0, NotchSettings::default()).unwrap();
    group.bench_function("notch_50hz", |b| {
        b.iter(|| black_box(notch.process(black_box(&sim.signal)).unwrap()))
    });

    let bandpass = BandpassFilter::default();
    group.bench_function("bandpass_order75", |b| {
        b.iter(|| black_box(bandpass.process(black_box(&sim.signal)).unwrap()))
    });

    group.finish();
}

/// Matcher and scorer on long peak sequences
fn bench_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching");

    for &beats in &[100usize, 1_000, 10_000] {
        let reference: Vec<usize> = (0..beats).map(|i| 250 + i * 400).collect();
        let test: Vec<usize> = reference.iter().map(|p| p + (p % 7)).collect();

        group.bench_with_input(BenchmarkId::new("match_peaks", beats), &beats, |b, _| {
            b.iter(|| black_box(match_peaks(black_box(&reference), black_box(&test)).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("score_peaks", beats), &beats, |b, _| {
            b.iter(|| {
                black_box(
                    score_peaks(&reference, &test, ToleranceWindow::default(), 500.0).unwrap(),
                )
            })
        });
    }

    group.finish();
}

/// Full detector + scorer run, sequential and channel-parallel
fn bench_orchestrator(c: &mut Criterion) {
    let mut group = c.benchmark_group("bsqi");
    group.sample_size(20);
    let sim = simulate(8, 10.0);

    for parallel in [false, true] {
        let orchestrator = ChannelOrchestrator::default().with_parallel(parallel);
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_function(BenchmarkId::new("8_leads", label), |b| {
            b.iter(|| black_box(orchestrator.bsqi(black_box(&sim.signal), None).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_filters, bench_matching, bench_orchestrator);
criterion_main!(benches);
