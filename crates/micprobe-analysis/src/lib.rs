//! micprobe Analysis - the numeric half of microphone response measurement
//!
//! - [`stimulus`] - logarithmic sweep, white/pink noise and silence generators
//! - [`fft`] - FFT wrapper, analysis windows and FFT convolution
//! - [`deconvolution`] - impulse-response recovery and magnitude response
//! - [`curve`] - the [`FrequencyCurve`] value type
//! - [`aggregate`] - multi-take mean / standard deviation and anomaly flags
//! - [`smoothing`] - moving-average smoothing and reference normalization
//! - [`export`] - `;`-delimited CSV export and import
//!
//! ## Example Workflow
//!
//! ```rust
//! use micprobe_analysis::{aggregate, smooth, DeconvolutionEngine, StimulusGenerator};
//!
//! // 1. Generate the stimulus once and keep it for deconvolution
//! let sweep = StimulusGenerator::new(8000).sweep(0.25, 50.0, 3000.0).unwrap();
//!
//! // 2. Play / record takes (external); here the capture is the stimulus itself
//! let engine = DeconvolutionEngine::default();
//! let curves: Vec<_> = (0..3)
//!     .map(|_| engine.analyze(sweep.signal(), &sweep).unwrap())
//!     .collect();
//!
//! // 3. Combine takes and smooth
//! let result = aggregate(&curves, 6.0).unwrap();
//! assert!(result.anomalies.is_empty());
//! let smoothed = smooth(&result.mean, 5).unwrap();
//! assert_eq!(smoothed.len(), result.mean.len());
//! ```

pub mod aggregate;
pub mod curve;
pub mod deconvolution;
pub mod export;
pub mod fft;
pub mod smoothing;
pub mod stimulus;

// Re-export main types
pub use aggregate::{AggregateResult, aggregate};
pub use curve::FrequencyCurve;
pub use deconvolution::{DeconvolutionEngine, deconvolve, frequency_response};
pub use fft::{Fft, Window};
pub use smoothing::{normalize, smooth};
pub use stimulus::{
    SineSweep, Stimulus, StimulusGenerator, StimulusKind, StimulusParams, generate_pink_noise,
    generate_silence, generate_sweep, generate_white_noise,
};
