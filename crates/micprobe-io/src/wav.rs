//! WAV file reading and writing for [`Signal`]s.
//!
//! Channel layout is preserved in both directions: a stereo take is written
//! and read back as an interleaved two-channel signal.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavWriter};
use micprobe_core::Signal;
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let total_samples = reader.len() as u64;
    let num_frames = total_samples / spec.channels as u64;
    let duration_secs = num_frames as f64 / spec.sample_rate as f64;

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// Sample encoding used when writing.
///
/// 32 bits means IEEE float, anything else is integer PCM at that depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Bit depth per sample (16, 24 or 32).
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            bits_per_sample: 32,
        }
    }
}

impl WavSpec {
    fn to_hound(self, signal: &Signal) -> Result<hound::WavSpec> {
        let sample_format = match self.bits_per_sample {
            32 => SampleFormat::Float,
            16 | 24 => SampleFormat::Int,
            other => {
                return Err(Error::UnsupportedFormat(format!(
                    "{other}-bit samples (use 16, 24 or 32)"
                )));
            }
        };
        Ok(hound::WavSpec {
            channels: signal.channels(),
            sample_rate: signal.sample_rate(),
            bits_per_sample: self.bits_per_sample,
            sample_format,
        })
    }
}

/// Read a WAV file into a [`Signal`], keeping every channel.
///
/// Integer PCM is scaled to [-1, 1). An empty file is rejected because a
/// signal is never empty.
///
/// # Example
/// ```ignore
/// let take = read_signal("recordings/sm58/mic_take_1.wav")?;
/// println!("{} frames at {} Hz", take.frames(), take.sample_rate());
/// ```
pub fn read_signal<P: AsRef<Path>>(path: P) -> Result<Signal> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok(Signal::new(samples, spec.channels, spec.sample_rate)?)
}

/// Write a [`Signal`] to a WAV file with its own channel count and rate.
///
/// # Example
/// ```ignore
/// let sweep = StimulusGenerator::new(48000).sweep(10.0, 20.0, 20000.0)?;
/// write_signal("sweep.wav", sweep.signal(), WavSpec::default())?;
/// ```
pub fn write_signal<P: AsRef<Path>>(path: P, signal: &Signal, spec: WavSpec) -> Result<()> {
    let hound_spec = spec.to_hound(signal)?;
    let mut writer = WavWriter::create(path, hound_spec)?;

    if hound_spec.sample_format == SampleFormat::Float {
        for &sample in signal.samples() {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
        for &sample in signal.samples() {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }

    writer.finalize()?;
    tracing::debug!(
        channels = signal.channels(),
        frames = signal.frames(),
        bits = spec.bits_per_sample,
        "wrote WAV"
    );
    Ok(())
}
