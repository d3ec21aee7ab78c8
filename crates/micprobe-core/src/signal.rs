//! Interleaved sample buffers.

use crate::{Error, Result};

/// An ordered, non-empty sequence of interleaved samples at a known rate.
///
/// Multi-channel data is interleaved frame by frame: `[L0, R0, L1, R1, ...]`.
/// Construction validates that the buffer is non-empty and holds a whole
/// number of frames, so every `Signal` in circulation is well-formed.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl Signal {
    /// Create a signal from interleaved samples.
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(Error::invalid("signal must have at least one channel"));
        }
        if sample_rate == 0 {
            return Err(Error::invalid("sample rate must be positive"));
        }
        if samples.is_empty() {
            return Err(Error::invalid("signal must not be empty"));
        }
        if samples.len() % channels as usize != 0 {
            return Err(Error::invalid(format!(
                "{} samples do not form whole frames of {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Assemble a signal whose shape the caller already guarantees.
    pub(crate) fn from_parts(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        debug_assert!(!samples.is_empty() && samples.len() % channels as usize == 0);
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Create a single-channel signal.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(samples, 1, sample_rate)
    }

    /// Create an all-zero signal of `frames` frames.
    pub fn silent(frames: usize, channels: u16, sample_rate: u32) -> Result<Self> {
        Self::new(vec![0.0; frames * channels as usize], channels, sample_rate)
    }

    /// Build an interleaved signal from per-channel buffers of equal length.
    pub fn from_channels(channels: &[Vec<f32>], sample_rate: u32) -> Result<Self> {
        let Some(first) = channels.first() else {
            return Err(Error::invalid("signal must have at least one channel"));
        };
        let frames = first.len();
        if let Some(bad) = channels.iter().find(|c| c.len() != frames) {
            return Err(Error::ShapeMismatch {
                expected: frames,
                actual: bad.len(),
            });
        }

        let mut samples = Vec::with_capacity(frames * channels.len());
        for frame in 0..frames {
            samples.extend(channels.iter().map(|c| c[frame]));
        }
        Self::new(samples, channels.len() as u16, sample_rate)
    }

    /// Interleaved sample data.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Consume the signal and return its interleaved samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Number of interleaved channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Copy one channel out as a contiguous buffer, or `None` if it does not exist.
    pub fn channel(&self, index: usize) -> Option<Vec<f32>> {
        let channels = self.channels as usize;
        if index >= channels {
            return None;
        }
        Some(
            self.samples
                .chunks_exact(channels)
                .map(|frame| frame[index])
                .collect(),
        )
    }

    /// Peak absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    /// Return a copy with every sample multiplied by `gain`.
    pub fn scaled(&self, gain: f32) -> Self {
        Self {
            samples: self.samples.iter().map(|s| s * gain).collect(),
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Fail with [`Error::SampleRateMismatch`] unless the rate equals `expected`.
    pub fn ensure_sample_rate(&self, expected: u32) -> Result<()> {
        if self.sample_rate == expected {
            Ok(())
        } else {
            Err(Error::SampleRateMismatch {
                expected,
                actual: self.sample_rate,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_signal() {
        assert!(matches!(
            Signal::mono(Vec::new(), 48000),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn rejects_partial_frames() {
        assert!(Signal::new(vec![0.0; 3], 2, 48000).is_err());
    }

    #[test]
    fn rejects_zero_sample_rate() {
        assert!(Signal::mono(vec![0.0; 4], 0).is_err());
    }

    #[test]
    fn channel_extraction_deinterleaves() {
        let signal = Signal::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 48000).unwrap();
        assert_eq!(signal.frames(), 3);
        assert_eq!(signal.channel(0).unwrap(), vec![1.0, 3.0, 5.0]);
        assert_eq!(signal.channel(1).unwrap(), vec![2.0, 4.0, 6.0]);
        assert!(signal.channel(2).is_none());
    }

    #[test]
    fn from_channels_interleaves() {
        let signal = Signal::from_channels(&[vec![1.0, 3.0], vec![2.0, 4.0]], 44100).unwrap();
        assert_eq!(signal.samples(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(signal.channels(), 2);
    }

    #[test]
    fn from_channels_rejects_ragged_input() {
        let err = Signal::from_channels(&[vec![1.0, 3.0], vec![2.0]], 44100).unwrap_err();
        assert_eq!(
            err,
            Error::ShapeMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn ensure_sample_rate_reports_both_rates() {
        let signal = Signal::mono(vec![0.0; 8], 44100).unwrap();
        assert!(signal.ensure_sample_rate(44100).is_ok());
        assert_eq!(
            signal.ensure_sample_rate(48000),
            Err(Error::SampleRateMismatch {
                expected: 48000,
                actual: 44100
            })
        );
    }

    #[test]
    fn duration_and_peak() {
        let signal = Signal::mono(vec![0.1, -0.8, 0.3, 0.0], 4).unwrap();
        assert_eq!(signal.duration_secs(), 1.0);
        assert_eq!(signal.peak(), 0.8);
        assert_eq!(signal.scaled(0.5).peak(), 0.4);
    }
}
