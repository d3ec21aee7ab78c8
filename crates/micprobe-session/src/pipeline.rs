//! Take set → curve set pipeline, shared by live sessions and offline
//! processing of recorded take files.

use crate::{Result, SessionError};
use micprobe_analysis::{
    AggregateResult, DeconvolutionEngine, FrequencyCurve, Stimulus, Window, aggregate, normalize,
    smooth,
};
use micprobe_config::{Settings, paths};
use micprobe_core::Signal;
use std::path::Path;

/// Post-processing parameters for a take set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOptions {
    /// Anomaly threshold in dB.
    pub threshold_db: f32,
    /// Smoothing window in bins (odd).
    pub smoothing_bins: usize,
    /// Window applied to each impulse response.
    pub window: Window,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            threshold_db: 6.0,
            smoothing_bins: 5,
            window: Window::Hann,
        }
    }
}

impl From<&Settings> for AnalysisOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            threshold_db: settings.measurement.anomaly_threshold_db,
            smoothing_bins: settings.measurement.smoothing_bins,
            window: settings.analysis.window,
        }
    }
}

/// Every curve produced from one take set.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSet {
    /// Frequency response of each take, in take order.
    pub take_curves: Vec<FrequencyCurve>,
    /// Mean, spread and anomaly flags across the takes.
    pub aggregate: AggregateResult,
    /// Smoothed mean response.
    pub smoothed: FrequencyCurve,
    /// Smoothed response minus the reference, when one was supplied.
    pub normalized: Option<FrequencyCurve>,
}

impl CurveSet {
    /// 1-based indices of the anomalous takes.
    pub fn anomalies(&self) -> Vec<usize> {
        self.aggregate.anomalous_takes()
    }
}

/// Deconvolve each take against `stimulus`, aggregate, smooth and optionally
/// normalize against `reference`.
///
/// Multi-channel takes are analysed on their first channel. The stimulus must
/// be the unscaled instance that was played.
pub fn analyze_takes<'s>(
    takes: impl IntoIterator<Item = &'s Signal>,
    stimulus: &Stimulus,
    options: &AnalysisOptions,
    reference: Option<&FrequencyCurve>,
) -> Result<CurveSet> {
    let engine = DeconvolutionEngine::new(options.window);
    let take_curves = takes
        .into_iter()
        .map(|take| engine.analyze(take, stimulus))
        .collect::<micprobe_core::Result<Vec<_>>>()?;

    let aggregate = aggregate(&take_curves, options.threshold_db)?;
    let smoothed = smooth(&aggregate.mean, options.smoothing_bins)?;
    let normalized = reference
        .map(|reference| normalize(&smoothed, reference))
        .transpose()?;

    tracing::info!(
        takes = take_curves.len(),
        bins = smoothed.len(),
        anomalies = ?aggregate.anomalies,
        normalized = normalized.is_some(),
        "take set analysed"
    );

    Ok(CurveSet {
        take_curves,
        aggregate,
        smoothed,
        normalized,
    })
}

/// Load every `mic_take_<n>.wav` in `dir`, ordered by take number.
pub fn load_take_dir(dir: &Path) -> Result<Vec<Signal>> {
    let files = paths::list_take_files(dir);
    if files.is_empty() {
        return Err(SessionError::NoTakes(dir.to_path_buf()));
    }
    files
        .iter()
        .map(|path| {
            tracing::debug!(path = %path.display(), "loading take");
            micprobe_io::read_signal(path).map_err(SessionError::from)
        })
        .collect()
}
