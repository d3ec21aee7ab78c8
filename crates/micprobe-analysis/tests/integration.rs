//! Integration tests for micprobe-analysis.
//!
//! These run the full numeric pipeline (stimulus → simulated capture →
//! deconvolution → aggregation → smoothing → normalization → CSV) on short
//! synthetic signals with known properties.

use micprobe_analysis::export::{SMOOTHED_HEADER, read_curve_csv, write_response_with_std_csv};
use micprobe_analysis::{
    DeconvolutionEngine, FrequencyCurve, StimulusGenerator, aggregate, deconvolve,
    frequency_response, normalize, smooth,
};
use micprobe_core::{ChannelMode, Error, Signal, routing};
use tempfile::NamedTempFile;

const SAMPLE_RATE: u32 = 8000;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Delay a signal by `latency` samples and apply a gain, keeping its length.
fn simulate_capture(stimulus: &[f32], latency: usize, gain: f32) -> Vec<f32> {
    let mut out = vec![0.0; stimulus.len()];
    for i in latency..stimulus.len() {
        out[i] = stimulus[i - latency] * gain;
    }
    out
}

/// One-pole lowpass, a stand-in for a dull microphone.
fn lowpass(signal: &[f32], alpha: f32) -> Vec<f32> {
    let mut state = 0.0;
    signal
        .iter()
        .map(|&x| {
            state += alpha * (x - state);
            state
        })
        .collect()
}

// ===========================================================================
// Round trip
// ===========================================================================

#[test]
fn self_deconvolution_normalized_against_itself_is_zero_db() {
    let sweep = StimulusGenerator::new(SAMPLE_RATE)
        .sweep(0.5, 40.0, 3800.0)
        .unwrap();
    let ir = deconvolve(sweep.samples(), sweep.samples()).unwrap();
    let curve = frequency_response(&ir, SAMPLE_RATE).unwrap();

    let normalized = normalize(&curve, &curve).unwrap();
    assert!(normalized.mean_db().abs() < 1e-6);
    assert!(normalized.magnitude_db().iter().all(|&db| db == 0.0));
}

#[test]
fn frequency_curve_has_half_window_plus_one_bins() {
    let sweep = StimulusGenerator::new(SAMPLE_RATE)
        .sweep(0.25, 40.0, 3800.0)
        .unwrap();
    let engine = DeconvolutionEngine::default();
    let curve = engine.analyze(sweep.signal(), &sweep).unwrap();

    // IR is 2*2000-1 samples, shorter than one second at 8 kHz
    let n = 2 * sweep.len() - 1;
    assert_eq!(curve.len(), n / 2 + 1);
    assert_eq!(curve.frequencies()[0], 0.0);
    let last = *curve.frequencies().last().unwrap();
    assert!(last <= SAMPLE_RATE as f32 / 2.0);
}

#[test]
fn filtered_capture_loses_high_frequencies_relative_to_reference() {
    let sweep = StimulusGenerator::new(SAMPLE_RATE)
        .sweep(0.5, 40.0, 3800.0)
        .unwrap();
    let engine = DeconvolutionEngine::default();

    // Capture both with the same latency so the one-second window sees the
    // same portion of each impulse response.
    let reference_capture = simulate_capture(sweep.samples(), 0, 1.0);
    let dull_capture = lowpass(&reference_capture, 0.2);

    let reference = engine
        .analyze(&Signal::mono(reference_capture, SAMPLE_RATE).unwrap(), &sweep)
        .unwrap();
    let dull = engine
        .analyze(&Signal::mono(dull_capture, SAMPLE_RATE).unwrap(), &sweep)
        .unwrap();

    let relative = normalize(&smooth(&dull, 9).unwrap(), &smooth(&reference, 9).unwrap()).unwrap();
    let low = relative.magnitude_at(200.0);
    let high = relative.magnitude_at(3000.0);
    assert!(
        high < low - 6.0,
        "lowpassed capture should lose highs: low {low:.1} dB, high {high:.1} dB"
    );
}

// ===========================================================================
// Aggregation over deconvolved takes
// ===========================================================================

#[test]
fn three_clean_takes_aggregate_without_anomalies() {
    let sweep = StimulusGenerator::new(SAMPLE_RATE)
        .sweep(0.25, 40.0, 3800.0)
        .unwrap();
    let engine = DeconvolutionEngine::default();
    let take = Signal::mono(simulate_capture(sweep.samples(), 5, 0.5), SAMPLE_RATE).unwrap();

    let curves: Vec<FrequencyCurve> = (0..3).map(|_| engine.analyze(&take, &sweep).unwrap()).collect();
    let result = aggregate(&curves, 6.0).unwrap();

    assert!(result.anomalies.is_empty());
    assert_eq!(result.mean, curves[0]);
    assert!(result.std_dev.magnitude_db().iter().all(|&s| s.abs() < 1e-4));
}

#[test]
fn takes_from_different_stimulus_lengths_are_a_shape_mismatch() {
    let generator = StimulusGenerator::new(SAMPLE_RATE);
    let short = generator.sweep(0.2, 40.0, 3800.0).unwrap();
    let long = generator.sweep(0.3, 40.0, 3800.0).unwrap();
    let engine = DeconvolutionEngine::default();

    let a = engine.analyze(short.signal(), &short).unwrap();
    let b = engine.analyze(long.signal(), &long).unwrap();
    assert!(matches!(
        aggregate(&[a, b], 6.0),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn stereo_capture_analyzes_channel_zero() {
    let sweep = StimulusGenerator::new(SAMPLE_RATE)
        .sweep(0.2, 40.0, 3800.0)
        .unwrap();
    let stereo = routing::pan(sweep.signal(), ChannelMode::Stereo);
    let passthrough = routing::extract(&stereo, ChannelMode::Stereo);
    assert_eq!(passthrough.channels(), 2);

    let engine = DeconvolutionEngine::default();
    assert_eq!(
        engine.analyze(&passthrough, &sweep).unwrap(),
        engine.analyze(sweep.signal(), &sweep).unwrap()
    );
}

// ===========================================================================
// Export
// ===========================================================================

#[test]
fn aggregated_response_survives_csv_roundtrip() {
    let sweep = StimulusGenerator::new(SAMPLE_RATE)
        .sweep(0.2, 40.0, 3800.0)
        .unwrap();
    let engine = DeconvolutionEngine::default();
    let curve = engine.analyze(sweep.signal(), &sweep).unwrap();
    let result = aggregate(&[curve.clone(), curve], 6.0).unwrap();
    let smoothed = smooth(&result.mean, 5).unwrap();

    let file = NamedTempFile::new().unwrap();
    write_response_with_std_csv(&smoothed, &result.std_dev, file.path()).unwrap();

    let header = std::fs::read_to_string(file.path()).unwrap();
    assert!(header.starts_with(SMOOTHED_HEADER));

    let loaded = read_curve_csv(file.path()).unwrap();
    assert_eq!(loaded.len(), smoothed.len());
    for (a, b) in loaded.magnitude_db().iter().zip(smoothed.magnitude_db()) {
        assert!((a - b).abs() < 0.006, "{a} vs {b}");
    }
}
