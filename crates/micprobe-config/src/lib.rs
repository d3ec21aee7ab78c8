//! Measurement configuration for micprobe.
//!
//! Settings are a typed structure, validated once before a session starts,
//! instead of loosely keyed maps read ad hoc.
//!
//! # Features
//!
//! - **Settings**: [`Settings`] groups [`MeasurementConfig`], [`TransportConfig`],
//!   [`StimulusConfig`], [`AnalysisConfig`] and the saved [`DeviceSelection`]
//! - **TOML**: load and save with `serde` + `toml`; missing fields take defaults
//! - **Validation**: [`Settings::validate`] reports every invalid field at once
//! - **Paths**: platform config directory plus the recordings / output layout
//!
//! # Example
//!
//! ```rust,no_run
//! use micprobe_config::{Settings, paths};
//!
//! let mut settings = Settings::load_or_default(paths::config_file()).unwrap();
//! settings.measurement.take_count = 5;
//! settings.validate().unwrap();
//! settings.save(paths::config_file()).unwrap();
//! ```

mod error;
mod settings;

/// Platform-specific paths and on-disk layout.
pub mod paths;

/// Settings validation.
pub mod validation;

pub use error::ConfigError;
pub use settings::{
    AnalysisConfig, AnomalyPolicy, DeviceSelection, MeasurementConfig, SavedDevice, Settings,
    StimulusConfig, TransportConfig,
};
pub use validation::{ValidationError, ValidationResult};
