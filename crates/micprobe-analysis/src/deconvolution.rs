//! Impulse-response recovery and magnitude-response extraction
//!
//! Deconvolution here is the matched-filter approximation used for sweep
//! measurements: the captured signal is linearly convolved with a
//! peak-normalized, time-reversed copy of the stimulus. For a logarithmic
//! sweep the result peaks at the direct-path response, `len(stimulus) - 1`
//! samples in plus the round-trip latency.
//!
//! The magnitude response is taken from the first `min(len(ir), sample_rate)`
//! samples of the impulse response. The FFT size equals that window length,
//! so an impulse response shorter than one second yields a coarser frequency
//! grid; callers comparing curves must use impulse responses of equal length.

use crate::curve::FrequencyCurve;
use crate::fft::{Fft, Window, bin_frequencies, fft_convolve, magnitude_db};
use crate::stimulus::Stimulus;
use micprobe_core::{Error, Result, Signal};

/// Added to the stimulus peak before normalization so a silent stimulus
/// does not divide by zero.
pub const STABILITY_EPSILON: f32 = 1e-8;

/// Recover an impulse response from a captured signal and its stimulus.
///
/// Returns `captured.len() + stimulus.len() - 1` samples.
pub fn deconvolve(captured: &[f32], stimulus: &[f32]) -> Result<Vec<f32>> {
    if captured.is_empty() {
        return Err(Error::invalid("captured signal is empty"));
    }
    if stimulus.is_empty() {
        return Err(Error::invalid("stimulus is empty"));
    }

    let peak = stimulus.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    let scale = 1.0 / (peak + STABILITY_EPSILON);
    let inverse: Vec<f32> = stimulus.iter().rev().map(|&s| s * scale).collect();

    Ok(fft_convolve(captured, &inverse))
}

/// Magnitude response of an impulse response using a Hann window.
pub fn frequency_response(impulse_response: &[f32], sample_rate: u32) -> Result<FrequencyCurve> {
    frequency_response_with_window(impulse_response, sample_rate, Window::Hann)
}

/// Magnitude response of an impulse response using the given window.
///
/// Bins run from 0 Hz to Nyquist of a `min(len, sample_rate)`-point FFT;
/// zero-magnitude bins are floored before conversion so no bin is `-inf`.
pub fn frequency_response_with_window(
    impulse_response: &[f32],
    sample_rate: u32,
    window: Window,
) -> Result<FrequencyCurve> {
    if sample_rate == 0 {
        return Err(Error::invalid("sample rate must be positive"));
    }
    let n = impulse_response.len().min(sample_rate as usize);
    if n == 0 {
        return Err(Error::invalid("impulse response is empty"));
    }

    let mut windowed = impulse_response[..n].to_vec();
    window.apply(&mut windowed);

    let spectrum = Fft::new(n).forward(&windowed);
    let frequencies = bin_frequencies(n, sample_rate as f32);

    FrequencyCurve::new(frequencies, magnitude_db(&spectrum))
}

/// Deconvolution bound to one analysis window.
///
/// # Example
///
/// ```rust
/// use micprobe_analysis::deconvolution::DeconvolutionEngine;
/// use micprobe_analysis::stimulus::generate_sweep;
///
/// let sweep = generate_sweep(0.25, 8000, 50.0, 3000.0).unwrap();
/// let engine = DeconvolutionEngine::default();
/// let curve = engine.analyze(sweep.signal(), &sweep).unwrap();
///
/// // 2000-sample sweep: a 3999-sample impulse response, shorter than one
/// // second, so the FFT spans 3999 points
/// assert_eq!(curve.len(), (2 * sweep.len() - 1) / 2 + 1);
/// assert_eq!(curve.len(), 2000);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DeconvolutionEngine {
    window: Window,
}

impl DeconvolutionEngine {
    /// Create an engine that analyzes with `window`.
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    /// Analysis window in use.
    pub fn window(&self) -> Window {
        self.window
    }

    /// Impulse response of `captured` (channel 0) against `stimulus`.
    pub fn impulse_response(&self, captured: &Signal, stimulus: &Stimulus) -> Result<Vec<f32>> {
        captured.ensure_sample_rate(stimulus.sample_rate())?;
        let analysis = if captured.channels() == 1 {
            captured.samples().to_vec()
        } else {
            captured.channel(0).unwrap_or_default()
        };
        deconvolve(&analysis, stimulus.samples())
    }

    /// Frequency response of `captured` against `stimulus`.
    pub fn analyze(&self, captured: &Signal, stimulus: &Stimulus) -> Result<FrequencyCurve> {
        let ir = self.impulse_response(captured, stimulus)?;
        frequency_response_with_window(&ir, stimulus.sample_rate(), self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stimulus::generate_sweep;

    #[test]
    fn test_ir_length_is_full_convolution() {
        let ir = deconvolve(&[0.0; 10], &[1.0; 4]).unwrap();
        assert_eq!(ir.len(), 13);
    }

    #[test]
    fn test_ir_peak_tracks_latency() {
        let sweep = generate_sweep(0.25, 8000, 50.0, 3500.0).unwrap();
        let stimulus = sweep.samples();
        let latency = 37;

        let mut captured = vec![0.0; stimulus.len()];
        captured[latency..].copy_from_slice(&stimulus[..stimulus.len() - latency]);

        let ir = deconvolve(&captured, stimulus).unwrap();
        let (peak_idx, _) = ir
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().partial_cmp(&b.1.abs()).unwrap())
            .unwrap();
        assert_eq!(peak_idx, stimulus.len() - 1 + latency);
    }

    #[test]
    fn test_silent_stimulus_does_not_divide_by_zero() {
        let ir = deconvolve(&[0.5; 8], &[0.0; 8]).unwrap();
        assert!(ir.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(deconvolve(&[], &[1.0]).is_err());
        assert!(deconvolve(&[1.0], &[]).is_err());
        assert!(frequency_response(&[], 48000).is_err());
    }

    #[test]
    fn test_window_truncated_to_one_second() {
        let ir = vec![0.0; 3000];
        let curve = frequency_response(&ir, 1000).unwrap();
        assert_eq!(curve.len(), 501);
        assert_eq!(curve.frequencies()[500], 500.0);
    }

    #[test]
    fn test_short_ir_sets_resolution() {
        let mut ir = vec![0.0; 64];
        ir[10] = 1.0;
        let curve = frequency_response(&ir, 48000).unwrap();
        assert_eq!(curve.len(), 33);
        assert_eq!(curve.frequencies()[1], 750.0);
    }

    #[test]
    fn test_zero_ir_is_flat_floor() {
        let curve = frequency_response(&[0.0; 256], 48000).unwrap();
        let first = curve.magnitude_db()[0];
        assert!(first.is_finite());
        assert!(curve.magnitude_db().iter().all(|&db| db == first));
    }

    #[test]
    fn test_centered_impulse_is_nearly_flat() {
        let mut ir = vec![0.0; 1001];
        ir[500] = 1.0;
        let curve = frequency_response_with_window(&ir, 1000, Window::Rectangular).unwrap();
        assert!(curve.magnitude_db().iter().all(|db| db.abs() < 1e-3));
    }

    #[test]
    fn test_engine_bin_count_follows_ir_length() {
        let engine = DeconvolutionEngine::default();

        // 2000 samples -> 3999-sample IR, under one second at 8 kHz
        let short = generate_sweep(0.25, 8000, 50.0, 3000.0).unwrap();
        let curve = engine.analyze(short.signal(), &short).unwrap();
        assert_eq!(curve.len(), 2000);

        // 12000 samples -> IR longer than one second, window capped at 8000
        let long = generate_sweep(1.5, 8000, 50.0, 3000.0).unwrap();
        let curve = engine.analyze(long.signal(), &long).unwrap();
        assert_eq!(curve.len(), 8000 / 2 + 1);
    }

    #[test]
    fn test_engine_rejects_rate_mismatch() {
        let sweep = generate_sweep(0.1, 8000, 50.0, 3000.0).unwrap();
        let captured = Signal::mono(vec![0.0; 800], 16000).unwrap();
        let err = DeconvolutionEngine::default()
            .analyze(&captured, &sweep)
            .unwrap_err();
        assert_eq!(
            err,
            Error::SampleRateMismatch {
                expected: 8000,
                actual: 16000
            }
        );
    }

    #[test]
    fn test_engine_uses_channel_zero_of_stereo_capture() {
        let sweep = generate_sweep(0.1, 8000, 50.0, 3000.0).unwrap();
        let stereo = micprobe_core::routing::pan(sweep.signal(), micprobe_core::ChannelMode::Left);
        let engine = DeconvolutionEngine::default();
        let from_stereo = engine.analyze(&stereo, &sweep).unwrap();
        let from_mono = engine.analyze(sweep.signal(), &sweep).unwrap();
        assert_eq!(from_stereo, from_mono);
    }
}
