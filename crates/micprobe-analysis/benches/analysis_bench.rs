//! Criterion benchmarks for micprobe-analysis
//!
//! Run with: cargo bench -p micprobe-analysis

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use micprobe_analysis::{
    FrequencyCurve, StimulusGenerator, aggregate, deconvolve, frequency_response, smooth,
};

const SAMPLE_RATE: u32 = 48000;

fn bench_deconvolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("deconvolution");
    group.sample_size(10);

    for &seconds in &[0.5f32, 2.0] {
        let sweep = StimulusGenerator::new(SAMPLE_RATE)
            .sweep(seconds, 20.0, 20000.0)
            .unwrap();
        group.bench_with_input(
            BenchmarkId::new("deconvolve", format!("{seconds}s")),
            &sweep,
            |b, sweep| b.iter(|| deconvolve(black_box(sweep.samples()), sweep.samples()).unwrap()),
        );
    }
    group.finish();
}

fn bench_frequency_response(c: &mut Criterion) {
    let ir: Vec<f32> = (0..SAMPLE_RATE as usize * 2)
        .map(|i| (-(i as f32) / 2000.0).exp())
        .collect();
    c.bench_function("frequency_response_1s", |b| {
        b.iter(|| frequency_response(black_box(&ir), SAMPLE_RATE).unwrap())
    });
}

fn bench_statistics(c: &mut Criterion) {
    let bins = SAMPLE_RATE as usize / 2 + 1;
    let freqs: Vec<f32> = (0..bins).map(|i| i as f32).collect();
    let curves: Vec<FrequencyCurve> = (0..3)
        .map(|t| {
            let db = (0..bins).map(|i| ((i + t) as f32 * 0.01).sin()).collect();
            FrequencyCurve::new(freqs.clone(), db).unwrap()
        })
        .collect();

    c.bench_function("aggregate_3_takes", |b| {
        b.iter(|| aggregate(black_box(&curves), 6.0).unwrap())
    });
    c.bench_function("smooth_5_bins", |b| {
        b.iter(|| smooth(black_box(&curves[0]), 5).unwrap())
    });
}

criterion_group!(
    benches,
    bench_deconvolution,
    bench_frequency_response,
    bench_statistics
);
criterion_main!(benches);
