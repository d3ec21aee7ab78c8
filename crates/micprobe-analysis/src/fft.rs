//! FFT wrapper with windowing functions

use micprobe_core::linear_to_db;
use rustfft::{FftPlanner, num_complex::Complex};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::sync::Arc;

/// Window function types
///
/// All windows are the symmetric form, so the first and last coefficients
/// mirror each other (`w[n] == w[N-1-n]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    /// Rectangular (no windowing)
    Rectangular,
    /// Hann window (raised cosine)
    #[default]
    Hann,
    /// Hamming window
    Hamming,
    /// Blackman window
    Blackman,
}

impl Window {
    /// Apply window to a buffer
    pub fn apply(&self, buffer: &mut [f32]) {
        let n = buffer.len();
        if n < 2 {
            // np.hanning(1) == [1.0]; a single sample is left untouched
            return;
        }
        let denom = (n - 1) as f32;
        match self {
            Window::Rectangular => {}
            Window::Hann => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let w = 0.5 - 0.5 * (2.0 * PI * i as f32 / denom).cos();
                    *sample *= w;
                }
            }
            Window::Hamming => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let w = 0.54 - 0.46 * (2.0 * PI * i as f32 / denom).cos();
                    *sample *= w;
                }
            }
            Window::Blackman => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let x = 2.0 * PI * i as f32 / denom;
                    let w = 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos();
                    *sample *= w;
                }
            }
        }
    }

    /// Get window coefficients
    pub fn coefficients(&self, size: usize) -> Vec<f32> {
        let mut coeffs = vec![1.0; size];
        self.apply(&mut coeffs);
        coeffs
    }
}

/// FFT processor holding forward and inverse plans of one size
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f32>>,
    ifft: Arc<dyn rustfft::Fft<f32>>,
    size: usize,
}

impl Fft {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);

        Self { fft, ifft, size }
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Perform forward FFT on real input
    ///
    /// Returns complex spectrum (size/2 + 1 bins for positive frequencies)
    pub fn forward(&self, input: &[f32]) -> Vec<Complex<f32>> {
        let mut buffer: Vec<Complex<f32>> = input.iter().map(|&x| Complex::new(x, 0.0)).collect();

        // Pad or truncate to FFT size
        buffer.resize(self.size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        // Return only positive frequencies (DC to Nyquist)
        buffer.truncate(self.size / 2 + 1);
        buffer
    }

    /// Perform forward FFT on complex input (in-place)
    pub fn forward_complex(&self, buffer: &mut [Complex<f32>]) {
        self.fft.process(buffer);
    }

    /// Perform inverse FFT on complex buffer (in-place, normalized)
    pub fn inverse_complex(&self, buffer: &mut [Complex<f32>]) {
        self.ifft.process(buffer);

        let scale = 1.0 / self.size as f32;
        for c in buffer.iter_mut() {
            *c *= scale;
        }
    }
}

/// Linear convolution of two real sequences via zero-padded FFT.
///
/// The result has `a.len() + b.len() - 1` samples; either input being empty
/// yields an empty result.
pub fn fft_convolve(a: &[f32], b: &[f32]) -> Vec<f32> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let out_len = a.len() + b.len() - 1;
    let fft_size = out_len.next_power_of_two();
    let fft = Fft::new(fft_size);

    let mut a_complex: Vec<Complex<f32>> = a.iter().map(|&x| Complex::new(x, 0.0)).collect();
    a_complex.resize(fft_size, Complex::new(0.0, 0.0));

    let mut b_complex: Vec<Complex<f32>> = b.iter().map(|&x| Complex::new(x, 0.0)).collect();
    b_complex.resize(fft_size, Complex::new(0.0, 0.0));

    fft.forward_complex(&mut a_complex);
    fft.forward_complex(&mut b_complex);

    for (x, y) in a_complex.iter_mut().zip(b_complex.iter()) {
        *x *= *y;
    }

    fft.inverse_complex(&mut a_complex);

    a_complex.truncate(out_len);
    a_complex.iter().map(|c| c.re).collect()
}

/// Compute magnitude spectrum in dB, flooring silent bins
pub fn magnitude_db(spectrum: &[Complex<f32>]) -> Vec<f32> {
    spectrum.iter().map(|c| linear_to_db(c.norm())).collect()
}

/// Frequency in Hz of each bin of an `fft_size`-point real FFT (DC to Nyquist)
pub fn bin_frequencies(fft_size: usize, sample_rate: f32) -> Vec<f32> {
    let bin_width = sample_rate / fft_size as f32;
    (0..=fft_size / 2).map(|k| k as f32 * bin_width).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_hann_symmetric() {
        let mut buffer = vec![1.0; 101];
        Window::Hann.apply(&mut buffer);

        // Symmetric Hann is exactly 0 at both edges, 1 at center
        assert!(buffer[0].abs() < 1e-6);
        assert!(buffer[100].abs() < 1e-6);
        assert!((buffer[50] - 1.0).abs() < 1e-6);
        for i in 0..50 {
            assert!((buffer[i] - buffer[100 - i]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_single_sample_window_is_identity() {
        let mut buffer = vec![0.7];
        Window::Hann.apply(&mut buffer);
        assert_eq!(buffer, vec![0.7]);
    }

    #[test]
    fn test_dc_detection() {
        let fft = Fft::new(256);

        let input = vec![1.0; 256];
        let spectrum = fft.forward(&input);
        assert_eq!(spectrum.len(), 129);

        let dc_mag = spectrum[0].norm();
        let other_mag: f32 = spectrum[1..].iter().map(|c| c.norm()).sum();

        assert!(dc_mag > other_mag * 10.0);
    }

    #[test]
    fn test_odd_size_forward_bin_count() {
        let fft = Fft::new(255);
        assert_eq!(fft.forward(&[1.0; 255]).len(), 128);
    }

    #[test]
    fn test_convolve_matches_direct_form() {
        let a = [1.0, 2.0, 3.0];
        let b = [0.5, -1.0];
        let expected = [0.5, 0.0, -0.5, -3.0];
        let out = fft_convolve(&a, &b);
        assert_eq!(out.len(), 4);
        for (x, y) in out.iter().zip(expected.iter()) {
            assert!((x - y).abs() < 1e-5, "{x} vs {y}");
        }
    }

    #[test]
    fn test_convolve_with_unit_impulse_is_identity() {
        let a: Vec<f32> = (0..37).map(|i| (i as f32 * 0.3).sin()).collect();
        let out = fft_convolve(&a, &[1.0]);
        assert_eq!(out.len(), a.len());
        for (x, y) in out.iter().zip(a.iter()) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_magnitude_db_floors_zero_bins() {
        let spectrum = vec![Complex::new(0.0, 0.0), Complex::new(1.0, 0.0)];
        let db = magnitude_db(&spectrum);
        assert!(db[0].is_finite());
        assert!((db[0] + 240.0).abs() < 0.01);
        assert!(db[1].abs() < 1e-6);
    }

    #[test]
    fn test_bin_frequencies_span_dc_to_nyquist() {
        let freqs = bin_frequencies(8, 48000.0);
        assert_eq!(freqs.len(), 5);
        assert_eq!(freqs[0], 0.0);
        assert_eq!(freqs[4], 24000.0);
    }
}
