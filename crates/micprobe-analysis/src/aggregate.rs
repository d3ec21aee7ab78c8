//! Multi-take statistics and anomaly flagging
//!
//! Repeated takes of the same measurement are combined bin by bin into a mean
//! curve and a population standard-deviation curve. A take is flagged as
//! anomalous when its deviation from the cross-take mean exceeds the threshold
//! at *any* bin: one dropout click is enough to make the whole take suspect.
//!
//! Flagging is advisory. [`aggregate`] never discards a take; deciding between
//! retrying and accepting with a warning is left to the caller.
//!
//! Note that the mean includes the take being tested. With three takes, a
//! single take offset by `d` dB deviates from the mean by `2d/3` while the
//! other two deviate by `d/3`.

use crate::curve::FrequencyCurve;
use micprobe_core::{Error, Result};
use std::collections::BTreeSet;

/// Result of combining a fixed list of takes.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    /// Per-bin arithmetic mean.
    pub mean: FrequencyCurve,
    /// Per-bin population standard deviation (dB).
    pub std_dev: FrequencyCurve,
    /// 1-based indices of takes that exceeded the threshold at some bin.
    pub anomalies: BTreeSet<usize>,
    /// Threshold the anomalies were classified against.
    pub threshold_db: f32,
    /// Number of takes combined.
    pub take_count: usize,
}

impl AggregateResult {
    /// Whether any take was flagged.
    pub fn has_anomalies(&self) -> bool {
        !self.anomalies.is_empty()
    }

    /// Flagged take indices in ascending order.
    pub fn anomalous_takes(&self) -> Vec<usize> {
        self.anomalies.iter().copied().collect()
    }
}

/// Combine take curves into mean, standard deviation and anomaly set.
///
/// All curves must share the bin count of the first one
/// ([`Error::ShapeMismatch`] otherwise). An empty list or a negative / NaN
/// threshold fails with [`Error::InvalidParameter`].
pub fn aggregate(curves: &[FrequencyCurve], threshold_db: f32) -> Result<AggregateResult> {
    let Some(first) = curves.first() else {
        return Err(Error::invalid("cannot aggregate an empty take set"));
    };
    if threshold_db.is_nan() || threshold_db < 0.0 {
        return Err(Error::invalid(format!(
            "anomaly threshold must be non-negative, got {threshold_db}"
        )));
    }
    for curve in &curves[1..] {
        first.ensure_same_shape(curve)?;
    }

    let bins = first.len();
    let takes = curves.len() as f64;

    // Accumulate in f64 so identical takes reproduce their values exactly
    let mut sums = vec![0.0f64; bins];
    for curve in curves {
        for (acc, &db) in sums.iter_mut().zip(curve.magnitude_db()) {
            *acc += f64::from(db);
        }
    }
    let mean: Vec<f32> = sums.iter().map(|s| (s / takes) as f32).collect();

    let mut variance = vec![0.0f64; bins];
    let mut anomalies = BTreeSet::new();
    for (take, curve) in curves.iter().enumerate() {
        let mut flagged = false;
        for ((var, &m), &db) in variance.iter_mut().zip(&mean).zip(curve.magnitude_db()) {
            let deviation = db - m;
            *var += f64::from(deviation) * f64::from(deviation);
            if deviation.abs() > threshold_db {
                flagged = true;
            }
        }
        if flagged {
            anomalies.insert(take + 1);
        }
    }
    let std_dev: Vec<f32> = variance.iter().map(|v| (v / takes).sqrt() as f32).collect();

    if !anomalies.is_empty() {
        tracing::warn!(
            takes = curves.len(),
            threshold_db,
            anomalies = ?anomalies,
            "anomalous takes detected"
        );
    }

    Ok(AggregateResult {
        mean: first.with_magnitudes(mean)?,
        std_dev: first.with_magnitudes(std_dev)?,
        anomalies,
        threshold_db,
        take_count: curves.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(db: Vec<f32>) -> FrequencyCurve {
        let freqs = (0..db.len()).map(|i| i as f32 * 10.0).collect();
        FrequencyCurve::new(freqs, db).unwrap()
    }

    #[test]
    fn identical_takes_have_zero_spread() {
        let c = curve(vec![-3.0, 0.0, 2.5, -40.0]);
        let result = aggregate(&[c.clone(), c.clone(), c.clone()], 0.0).unwrap();
        assert_eq!(result.mean, c);
        assert!(result.std_dev.magnitude_db().iter().all(|&s| s == 0.0));
        assert!(!result.has_anomalies());
        assert_eq!(result.take_count, 3);
    }

    #[test]
    fn single_bin_outlier_flags_only_that_take() {
        let base = curve(vec![0.0; 16]);
        let mut spiked = vec![0.0; 16];
        spiked[7] = 2.0;
        let result = aggregate(&[base.clone(), curve(spiked), base], 1.0).unwrap();
        assert_eq!(result.anomalous_takes(), vec![2]);
    }

    #[test]
    fn default_threshold_sees_two_thirds_of_a_three_take_offset() {
        // The mean includes the offset take, so it deviates by 2d/3
        let base = curve(vec![0.0; 8]);
        let offset = |d: f32| {
            let mut db = vec![0.0; 8];
            db[3] = d;
            curve(db)
        };

        // 7 dB -> 4.67 dB from the mean, under the 6 dB default
        let result = aggregate(&[base.clone(), offset(7.0), base.clone()], 6.0).unwrap();
        assert!(!result.has_anomalies());

        // 9.5 dB -> 6.33 dB, the smallest half-dB step that trips 6 dB
        let result = aggregate(&[base.clone(), offset(9.5), base], 6.0).unwrap();
        assert_eq!(result.anomalous_takes(), vec![2]);
    }

    #[test]
    fn std_dev_is_population_form() {
        let result = aggregate(&[curve(vec![1.0]), curve(vec![3.0])], 10.0).unwrap();
        assert_eq!(result.mean.magnitude_db(), &[2.0]);
        assert_eq!(result.std_dev.magnitude_db(), &[1.0]);
    }

    #[test]
    fn deviation_equal_to_threshold_is_not_anomalous() {
        let result = aggregate(&[curve(vec![1.0]), curve(vec![3.0])], 1.0).unwrap();
        assert!(!result.has_anomalies());
    }

    #[test]
    fn shape_mismatch_rejected() {
        let err = aggregate(&[curve(vec![0.0; 4]), curve(vec![0.0; 5])], 6.0).unwrap_err();
        assert_eq!(
            err,
            Error::ShapeMismatch {
                expected: 4,
                actual: 5
            }
        );
    }

    #[test]
    fn empty_and_negative_threshold_rejected() {
        assert!(aggregate(&[], 6.0).is_err());
        assert!(aggregate(&[curve(vec![0.0])], -1.0).is_err());
        assert!(aggregate(&[curve(vec![0.0])], f32::NAN).is_err());
    }

    #[test]
    fn single_take_is_its_own_mean() {
        let c = curve(vec![1.0, 2.0]);
        let result = aggregate(std::slice::from_ref(&c), 0.0).unwrap();
        assert_eq!(result.mean, c);
        assert!(!result.has_anomalies());
    }
}
