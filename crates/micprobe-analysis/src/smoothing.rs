//! Post-processing of aggregated curves: smoothing and reference normalization.

use crate::curve::FrequencyCurve;
use micprobe_core::{Error, Result};

/// Moving-average smoothing of the dB values over an odd window of bins.
///
/// The output has the same length as the input. Bins near either edge average
/// over a truncated window (only the neighbours that exist), so there is no
/// wrap-around and no implicit zero padding.
pub fn smooth(curve: &FrequencyCurve, window_bins: usize) -> Result<FrequencyCurve> {
    if window_bins == 0 || window_bins % 2 == 0 {
        return Err(Error::invalid(format!(
            "smoothing window must be a positive odd number of bins, got {window_bins}"
        )));
    }
    let values = curve.magnitude_db();
    let half = window_bins / 2;

    // Prefix sums in f64 so long curves do not accumulate f32 drift
    let mut prefix = Vec::with_capacity(values.len() + 1);
    prefix.push(0.0f64);
    for &v in values {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + f64::from(v));
    }

    let smoothed = (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(values.len());
            ((prefix[hi] - prefix[lo]) / (hi - lo) as f64) as f32
        })
        .collect();

    curve.with_magnitudes(smoothed)
}

/// Subtract a reference curve bin by bin (`curve - reference`).
///
/// Expresses a device-under-test response relative to a reference microphone,
/// cancelling coloration the two measurements share.
pub fn normalize(curve: &FrequencyCurve, reference: &FrequencyCurve) -> Result<FrequencyCurve> {
    curve.ensure_same_shape(reference)?;
    let diff = curve
        .magnitude_db()
        .iter()
        .zip(reference.magnitude_db())
        .map(|(c, r)| c - r)
        .collect();
    curve.with_magnitudes(diff)
}
