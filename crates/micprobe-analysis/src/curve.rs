//! Frequency-response curves.

use micprobe_core::{Error, Result};

/// Magnitude response sampled on a monotonically increasing frequency axis.
///
/// A curve produced by [`frequency_response`](crate::deconvolution::frequency_response)
/// has `N/2 + 1` bins for an `N`-point real FFT, running from 0 Hz to Nyquist.
/// Curves are values: operations that change magnitudes return new curves.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyCurve {
    frequencies: Vec<f32>,
    magnitude_db: Vec<f32>,
}

impl FrequencyCurve {
    /// Create a curve from parallel frequency (Hz) and magnitude (dB) vectors.
    ///
    /// Fails with [`Error::ShapeMismatch`] if the lengths differ and with
    /// [`Error::InvalidParameter`] if the curve is empty or the frequency axis
    /// is not strictly increasing.
    pub fn new(frequencies: Vec<f32>, magnitude_db: Vec<f32>) -> Result<Self> {
        if frequencies.len() != magnitude_db.len() {
            return Err(Error::ShapeMismatch {
                expected: frequencies.len(),
                actual: magnitude_db.len(),
            });
        }
        if frequencies.is_empty() {
            return Err(Error::invalid("frequency curve must not be empty"));
        }
        if let Some(i) = frequencies.windows(2).position(|w| w[1] <= w[0]) {
            return Err(Error::invalid(format!(
                "frequency axis not increasing at bin {}: {} Hz then {} Hz",
                i + 1,
                frequencies[i],
                frequencies[i + 1]
            )));
        }
        Ok(Self {
            frequencies,
            magnitude_db,
        })
    }

    /// Frequencies in Hz.
    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    /// Magnitudes in dB.
    pub fn magnitude_db(&self) -> &[f32] {
        &self.magnitude_db
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Always false: curves are non-empty by construction.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate `(frequency_hz, magnitude_db)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.frequencies
            .iter()
            .copied()
            .zip(self.magnitude_db.iter().copied())
    }

    /// Same frequency axis with new magnitudes.
    pub fn with_magnitudes(&self, magnitude_db: Vec<f32>) -> Result<Self> {
        self.ensure_bins(magnitude_db.len())?;
        Ok(Self {
            frequencies: self.frequencies.clone(),
            magnitude_db,
        })
    }

    /// Fail with [`Error::ShapeMismatch`] unless `other` has the same bin count.
    pub fn ensure_same_shape(&self, other: &FrequencyCurve) -> Result<()> {
        self.ensure_bins(other.len())
    }

    /// Mean magnitude across all bins in dB.
    pub fn mean_db(&self) -> f32 {
        self.magnitude_db.iter().sum::<f32>() / self.len() as f32
    }

    /// Magnitude at the bin closest to `frequency_hz`.
    pub fn magnitude_at(&self, frequency_hz: f32) -> f32 {
        let idx = match self
            .frequencies
            .binary_search_by(|f| f.total_cmp(&frequency_hz))
        {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) if i >= self.len() => self.len() - 1,
            Err(i) => {
                if frequency_hz - self.frequencies[i - 1] <= self.frequencies[i] - frequency_hz {
                    i - 1
                } else {
                    i
                }
            }
        };
        self.magnitude_db[idx]
    }

    fn ensure_bins(&self, actual: usize) -> Result<()> {
        if actual == self.len() {
            Ok(())
        } else {
            Err(Error::ShapeMismatch {
                expected: self.len(),
                actual,
            })
        }
    }
}
