//! Test stimulus generation
//!
//! Four stimulus kinds are supported:
//!
//! - **Sweep**: logarithmic sine sweep (equal time per octave, so the matched
//!   filter recovers a response with uniform SNR across the band)
//! - **White noise**: i.i.d. Gaussian samples
//! - **Pink noise**: white noise through a fixed -3 dB/octave IIR tilt
//! - **Silence**: all-zero buffer for ambient noise-floor captures
//!
//! Every non-silent stimulus is normalized so its peak absolute sample is 1.0.
//! Noise generation is seeded, so the same generator always produces the same
//! waveform.

use micprobe_core::{Error, Result, Signal};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Seed used by the free-function noise generators.
pub const DEFAULT_SEED: u64 = 0x6d69_6370;

/// Feed-forward coefficients of the pink-noise tilt filter.
const PINK_B: [f64; 4] = [0.049922035, -0.095993537, 0.050612699, -0.004408786];
/// Feedback coefficients of the pink-noise tilt filter (`a[0] == 1`).
const PINK_A: [f64; 4] = [1.0, -2.494956002, 2.017265875, -0.522189400];

/// Kind of test waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StimulusKind {
    /// Logarithmic sine sweep.
    Sweep,
    /// Gaussian white noise.
    WhiteNoise,
    /// Pink (-3 dB/octave) noise.
    PinkNoise,
    /// Digital silence.
    Silence,
}

impl StimulusKind {
    /// File stem conventionally used when the stimulus is written to disk.
    pub fn file_stem(self) -> &'static str {
        match self {
            StimulusKind::Sweep => "sweep",
            StimulusKind::WhiteNoise => "white_noise",
            StimulusKind::PinkNoise => "pink_noise",
            StimulusKind::Silence => "silence",
        }
    }
}

impl fmt::Display for StimulusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StimulusKind::Sweep => "sweep",
            StimulusKind::WhiteNoise => "white-noise",
            StimulusKind::PinkNoise => "pink-noise",
            StimulusKind::Silence => "silence",
        };
        f.write_str(name)
    }
}

/// Parameters a stimulus was generated with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StimulusParams {
    /// Duration in seconds.
    pub duration_secs: f32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Swept band `(start, end)` in Hz; `None` for broadband or silent stimuli.
    pub frequency_range: Option<(f32, f32)>,
}

/// An immutable, generated test waveform.
///
/// The same `Stimulus` value must be used both for playback and as the
/// deconvolution reference of the takes it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Stimulus {
    kind: StimulusKind,
    params: StimulusParams,
    signal: Signal,
}

impl Stimulus {
    /// Wrap an existing mono signal (e.g. loaded from a WAV file) as a stimulus.
    ///
    /// Multi-channel signals are reduced to their first channel.
    pub fn from_signal(
        kind: StimulusKind,
        signal: Signal,
        frequency_range: Option<(f32, f32)>,
    ) -> Result<Self> {
        let signal = if signal.channels() == 1 {
            signal
        } else {
            Signal::mono(signal.channel(0).unwrap_or_default(), signal.sample_rate())?
        };
        let params = StimulusParams {
            duration_secs: signal.duration_secs() as f32,
            sample_rate: signal.sample_rate(),
            frequency_range,
        };
        Ok(Self {
            kind,
            params,
            signal,
        })
    }

    /// Stimulus kind.
    pub fn kind(&self) -> StimulusKind {
        self.kind
    }

    /// Generation parameters.
    pub fn params(&self) -> &StimulusParams {
        &self.params
    }

    /// The mono waveform.
    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Mono samples.
    pub fn samples(&self) -> &[f32] {
        self.signal.samples()
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.signal.sample_rate()
    }

    /// Length in samples.
    pub fn len(&self) -> usize {
        self.signal.frames()
    }

    /// Always false: stimuli are non-empty by construction.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Logarithmic sine sweep generator
///
/// Instantaneous frequency rises exponentially from `start_freq` to `end_freq`,
/// spending equal time in every octave.
pub struct SineSweep {
    sample_rate: u32,
    start_freq: f32,
    end_freq: f32,
    duration_secs: f32,
}

impl SineSweep {
    /// Create a new sine sweep generator
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz
    /// * `start_freq` - Start frequency in Hz
    /// * `end_freq` - End frequency in Hz
    /// * `duration_secs` - Sweep duration in seconds
    pub fn new(sample_rate: u32, start_freq: f32, end_freq: f32, duration_secs: f32) -> Self {
        Self {
            sample_rate,
            start_freq,
            end_freq,
            duration_secs,
        }
    }

    /// Check the sweep parameters.
    pub fn validate(&self) -> Result<()> {
        validate_timing(self.duration_secs, self.sample_rate)?;
        if !(self.start_freq.is_finite() && self.start_freq > 0.0) {
            return Err(Error::invalid(format!(
                "sweep start frequency must be positive, got {}",
                self.start_freq
            )));
        }
        if !self.end_freq.is_finite() || self.start_freq >= self.end_freq {
            return Err(Error::invalid(format!(
                "sweep start frequency {} Hz must be below end frequency {} Hz",
                self.start_freq, self.end_freq
            )));
        }
        let nyquist = self.sample_rate as f32 / 2.0;
        if self.end_freq > nyquist {
            return Err(Error::invalid(format!(
                "sweep end frequency {} Hz exceeds Nyquist ({} Hz)",
                self.end_freq, nyquist
            )));
        }
        if self.num_samples() < 2 {
            return Err(Error::invalid("sweep must span at least two samples"));
        }
        Ok(())
    }

    /// Generate the sweep, normalized to a peak of 1.0
    ///
    /// Sample times run from 0 to exactly `duration_secs` inclusive, so the
    /// last sample sits on `end_freq`.
    pub fn generate(&self) -> Vec<f32> {
        let num_samples = self.num_samples();
        if num_samples < 2 {
            return vec![0.0; num_samples];
        }
        let f0 = f64::from(self.start_freq);
        let f1 = f64::from(self.end_freq);
        let t1 = f64::from(self.duration_secs);
        let beta = t1 / (f1 / f0).ln();
        let step = t1 / (num_samples - 1) as f64;

        let raw: Vec<f64> = (0..num_samples)
            .map(|i| {
                let t = i as f64 * step;
                let phase = 2.0 * PI * beta * f0 * ((f1 / f0).powf(t / t1) - 1.0);
                phase.cos()
            })
            .collect();

        normalize_peak(&raw)
    }

    /// Get number of samples
    pub fn num_samples(&self) -> usize {
        (self.duration_secs * self.sample_rate as f32) as usize
    }
}

/// Deterministic stimulus factory for one sample rate.
///
/// # Example
///
/// ```rust
/// use micprobe_analysis::stimulus::{StimulusGenerator, StimulusKind};
///
/// let generator = StimulusGenerator::new(8000).with_seed(7);
/// let sweep = generator.sweep(0.5, 20.0, 4000.0).unwrap();
/// assert_eq!(sweep.kind(), StimulusKind::Sweep);
/// assert_eq!(sweep.len(), 4000);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StimulusGenerator {
    sample_rate: u32,
    seed: u64,
}

impl StimulusGenerator {
    /// Create a generator for the given sample rate using [`DEFAULT_SEED`].
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            seed: DEFAULT_SEED,
        }
    }

    /// Use a specific noise seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Logarithmic sine sweep from `f_start` to `f_end`.
    pub fn sweep(&self, duration_secs: f32, f_start: f32, f_end: f32) -> Result<Stimulus> {
        let sweep = SineSweep::new(self.sample_rate, f_start, f_end, duration_secs);
        sweep.validate()?;
        self.finish(
            StimulusKind::Sweep,
            duration_secs,
            Some((f_start, f_end)),
            sweep.generate(),
        )
    }

    /// Gaussian white noise.
    pub fn white_noise(&self, duration_secs: f32) -> Result<Stimulus> {
        let n = validate_timing(duration_secs, self.sample_rate)?;
        let noise = gaussian(n, self.seed);
        self.finish(
            StimulusKind::WhiteNoise,
            duration_secs,
            None,
            normalize_peak(&noise),
        )
    }

    /// Pink noise: seeded white noise through the tilt filter.
    pub fn pink_noise(&self, duration_secs: f32) -> Result<Stimulus> {
        let n = validate_timing(duration_secs, self.sample_rate)?;
        let white = gaussian(n, self.seed);
        let pink = iir_filter(&PINK_B, &PINK_A, &white);
        self.finish(
            StimulusKind::PinkNoise,
            duration_secs,
            None,
            normalize_peak(&pink),
        )
    }

    /// All-zero buffer.
    pub fn silence(&self, duration_secs: f32) -> Result<Stimulus> {
        let n = validate_timing(duration_secs, self.sample_rate)?;
        self.finish(StimulusKind::Silence, duration_secs, None, vec![0.0; n])
    }

    /// Generate any kind; the frequency bounds are only used for sweeps.
    pub fn generate(
        &self,
        kind: StimulusKind,
        duration_secs: f32,
        f_start: f32,
        f_end: f32,
    ) -> Result<Stimulus> {
        match kind {
            StimulusKind::Sweep => self.sweep(duration_secs, f_start, f_end),
            StimulusKind::WhiteNoise => self.white_noise(duration_secs),
            StimulusKind::PinkNoise => self.pink_noise(duration_secs),
            StimulusKind::Silence => self.silence(duration_secs),
        }
    }

    fn finish(
        &self,
        kind: StimulusKind,
        duration_secs: f32,
        frequency_range: Option<(f32, f32)>,
        samples: Vec<f32>,
    ) -> Result<Stimulus> {
        let signal = Signal::mono(samples, self.sample_rate)?;
        tracing::debug!(%kind, samples = signal.frames(), "stimulus generated");
        Ok(Stimulus {
            kind,
            params: StimulusParams {
                duration_secs,
                sample_rate: self.sample_rate,
                frequency_range,
            },
            signal,
        })
    }
}

/// Generate a logarithmic sweep with the default generator.
pub fn generate_sweep(
    duration_secs: f32,
    sample_rate: u32,
    f_start: f32,
    f_end: f32,
) -> Result<Stimulus> {
    StimulusGenerator::new(sample_rate).sweep(duration_secs, f_start, f_end)
}

/// Generate white noise with the default seed.
pub fn generate_white_noise(duration_secs: f32, sample_rate: u32) -> Result<Stimulus> {
    StimulusGenerator::new(sample_rate).white_noise(duration_secs)
}

/// Generate pink noise with the default seed.
pub fn generate_pink_noise(duration_secs: f32, sample_rate: u32) -> Result<Stimulus> {
    StimulusGenerator::new(sample_rate).pink_noise(duration_secs)
}

/// Generate silence.
pub fn generate_silence(duration_secs: f32, sample_rate: u32) -> Result<Stimulus> {
    StimulusGenerator::new(sample_rate).silence(duration_secs)
}

/// Validate duration/sample rate and return the sample count.
fn validate_timing(duration_secs: f32, sample_rate: u32) -> Result<usize> {
    if !(duration_secs.is_finite() && duration_secs > 0.0) {
        return Err(Error::invalid(format!(
            "duration must be positive, got {duration_secs}"
        )));
    }
    if sample_rate == 0 {
        return Err(Error::invalid("sample rate must be positive"));
    }
    let n = (duration_secs * sample_rate as f32) as usize;
    if n == 0 {
        return Err(Error::invalid(format!(
            "duration {duration_secs}s is shorter than one sample at {sample_rate} Hz"
        )));
    }
    Ok(n)
}

/// Zero-mean, unit-variance Gaussian samples (Box-Muller).
fn gaussian(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(n + 1);
    while out.len() < n {
        // 1 - gen() keeps u1 in (0, 1] so ln() stays finite
        let u1: f64 = 1.0 - rng.r#gen::<f64>();
        let u2: f64 = rng.r#gen::<f64>();
        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;
        out.push(radius * theta.cos());
        out.push(radius * theta.sin());
    }
    out.truncate(n);
    out
}

/// Direct-form IIR filter, `a[0]` assumed to be 1.
fn iir_filter(b: &[f64], a: &[f64], input: &[f64]) -> Vec<f64> {
    let mut output = Vec::with_capacity(input.len());
    for n in 0..input.len() {
        let mut acc = 0.0;
        for (k, &bk) in b.iter().enumerate() {
            if n >= k {
                acc += bk * input[n - k];
            }
        }
        for (k, &ak) in a.iter().enumerate().skip(1) {
            if n >= k {
                acc -= ak * output[n - k];
            }
        }
        output.push(acc);
    }
    output
}

/// Scale so the peak absolute sample is 1.0; an all-zero buffer stays zero.
fn normalize_peak(samples: &[f64]) -> Vec<f32> {
    let peak = samples.iter().map(|s| s.abs()).fold(0.0f64, f64::max);
    if peak <= 0.0 {
        return vec![0.0; samples.len()];
    }
    samples.iter().map(|&s| (s / peak) as f32).collect()
}
