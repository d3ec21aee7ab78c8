//! Settings structures and their TOML persistence.

use micprobe_analysis::Window;
use micprobe_core::ChannelMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::validation::{ValidationError, ValidationResult};

/// What a session does when aggregation flags anomalous takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyPolicy {
    /// Reject the take set and ask the caller to record again.
    #[default]
    Retry,
    /// Keep the take set and report the anomalies as a warning.
    Accept,
}

impl fmt::Display for AnomalyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnomalyPolicy::Retry => "retry",
            AnomalyPolicy::Accept => "accept",
        })
    }
}

impl FromStr for AnomalyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "retry" => Ok(AnomalyPolicy::Retry),
            "accept" => Ok(AnomalyPolicy::Accept),
            other => Err(format!("unknown anomaly policy '{other}' (retry|accept)")),
        }
    }
}

/// Core measurement values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    /// Session sample rate in Hz.
    pub sample_rate: u32,
    /// Per-bin deviation (dB) above which a take is anomalous.
    pub anomaly_threshold_db: f32,
    /// Takes per measurement.
    pub take_count: usize,
    /// Moving-average width in bins (odd).
    pub smoothing_bins: usize,
    /// Which captured channel is analysed.
    pub input_channel: ChannelMode,
    /// Which output channel carries the stimulus.
    pub output_channel: ChannelMode,
    /// Reaction to anomalous takes.
    pub anomaly_policy: AnomalyPolicy,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            anomaly_threshold_db: 6.0,
            take_count: 3,
            smoothing_bins: 5,
            input_channel: ChannelMode::Left,
            output_channel: ChannelMode::Left,
            anomaly_policy: AnomalyPolicy::Retry,
        }
    }
}

/// Duplex stream tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Hardware block size in frames.
    pub block_size: u32,
    /// Cursor poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Milliseconds without progress before a stream counts as stalled.
    pub stall_timeout_ms: u64,
    /// Linear gain applied to the stimulus before playback.
    pub output_gain: f32,
    /// Channels opened on the input device.
    pub input_channels: u16,
    /// Channels opened on the output device.
    pub output_channels: u16,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            block_size: 1024,
            poll_interval_ms: 50,
            stall_timeout_ms: 2000,
            output_gain: 0.8,
            input_channels: 2,
            output_channels: 2,
        }
    }
}

impl TransportConfig {
    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Stall timeout as a [`Duration`].
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }
}

/// Stimulus generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusConfig {
    /// Stimulus length in seconds.
    pub duration_secs: f32,
    /// Sweep start frequency in Hz.
    pub f_start: f32,
    /// Sweep end frequency in Hz.
    pub f_end: f32,
    /// Noise seed; `None` uses the built-in default seed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for StimulusConfig {
    fn default() -> Self {
        Self {
            duration_secs: 10.0,
            f_start: 20.0,
            f_end: 20000.0,
            seed: None,
        }
    }
}

/// Frequency-response analysis options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Window applied to the impulse response before the FFT.
    pub window: Window,
}

/// A device remembered between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedDevice {
    /// Host API name.
    pub host: String,
    /// Index in the host's device list.
    pub index: usize,
    /// Device name at the time it was saved.
    pub name: String,
}

/// Saved input/output device pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSelection {
    /// Capture device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<SavedDevice>,
    /// Playback device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<SavedDevice>,
}

/// Complete micprobe settings file.
///
/// # TOML Format
///
/// ```toml
/// [measurement]
/// sample_rate = 48000
/// anomaly_threshold_db = 6.0
/// take_count = 3
/// smoothing_bins = 5
/// input_channel = "left"
/// output_channel = "left"
/// anomaly_policy = "retry"
///
/// [transport]
/// block_size = 1024
/// output_gain = 0.8
///
/// [stimulus]
/// duration_secs = 10.0
/// f_start = 20.0
/// f_end = 20000.0
///
/// [devices.input]
/// host = "ALSA"
/// index = 3
/// name = "USB Audio"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Core measurement values.
    pub measurement: MeasurementConfig,
    /// Stream tuning.
    pub transport: TransportConfig,
    /// Stimulus parameters.
    pub stimulus: StimulusConfig,
    /// Analysis options.
    pub analysis: AnalysisConfig,
    /// Saved devices.
    pub devices: DeviceSelection,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let settings = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save the settings to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        tracing::info!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Set one value by dotted key, e.g. `measurement.take_count`.
    ///
    /// `value` is parsed as a TOML literal first (`5`, `6.5`, `true`) and
    /// used as a plain string otherwise (`left`). The result is validated
    /// before it replaces `self`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut root = toml::Value::try_from(&*self)?;
        let (section, field) = key
            .split_once('.')
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        let table = root
            .get_mut(section)
            .and_then(toml::Value::as_table_mut)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        let known = table.contains_key(field) || Self::optional_field(section, field);
        if !known {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let parsed = format!("v = {value}")
            .parse::<toml::Table>()
            .ok()
            .and_then(|mut t| t.remove("v"))
            .unwrap_or_else(|| toml::Value::String(value.to_string()));
        table.insert(field.to_string(), parsed);

        let updated: Settings = root.try_into()?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Fields skipped when `None`, so absent from the serialized table.
    fn optional_field(section: &str, field: &str) -> bool {
        matches!((section, field), ("stimulus", "seed"))
    }

    /// Check every field, reporting all problems together.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();
        let m = &self.measurement;
        let t = &self.transport;
        let s = &self.stimulus;

        let mut check = |ok: bool, field: &'static str, reason: String| {
            if !ok {
                errors.push(ValidationError::Field { field, reason });
            }
        };

        check(
            m.sample_rate > 0,
            "measurement.sample_rate",
            "must be positive".into(),
        );
        check(
            m.anomaly_threshold_db.is_finite() && m.anomaly_threshold_db >= 0.0,
            "measurement.anomaly_threshold_db",
            format!("must be a non-negative number, got {}", m.anomaly_threshold_db),
        );
        check(
            m.take_count >= 1,
            "measurement.take_count",
            "at least one take is required".into(),
        );
        check(
            m.smoothing_bins % 2 == 1,
            "measurement.smoothing_bins",
            format!("must be a positive odd number, got {}", m.smoothing_bins),
        );

        check(
            t.block_size > 0,
            "transport.block_size",
            "must be positive".into(),
        );
        check(
            t.poll_interval_ms > 0,
            "transport.poll_interval_ms",
            "must be positive".into(),
        );
        check(
            t.stall_timeout_ms >= t.poll_interval_ms,
            "transport.stall_timeout_ms",
            format!(
                "must be at least the poll interval ({} ms), got {}",
                t.poll_interval_ms, t.stall_timeout_ms
            ),
        );
        check(
            t.output_gain > 0.0 && t.output_gain <= 1.0,
            "transport.output_gain",
            format!("must be in (0, 1], got {}", t.output_gain),
        );
        check(
            t.input_channels >= 1,
            "transport.input_channels",
            "must be at least 1".into(),
        );
        check(
            t.output_channels == 2,
            "transport.output_channels",
            format!("the stimulus is panned to stereo, got {}", t.output_channels),
        );

        let nyquist = m.sample_rate as f32 / 2.0;
        check(
            s.duration_secs.is_finite() && s.duration_secs > 0.0,
            "stimulus.duration_secs",
            format!("must be positive, got {}", s.duration_secs),
        );
        check(
            s.f_start > 0.0 && s.f_start < s.f_end,
            "stimulus.f_start",
            format!("must satisfy 0 < f_start < f_end, got {} / {}", s.f_start, s.f_end),
        );
        check(
            s.f_end <= nyquist,
            "stimulus.f_end",
            format!("must not exceed Nyquist ({nyquist} Hz), got {}", s.f_end),
        );

        ValidationError::collect(errors)
    }
}
