//! micprobe Core - shared data model for microphone frequency-response measurement
//!
//! This crate holds the types every other micprobe crate agrees on:
//!
//! - [`Signal`] - interleaved sample buffer tagged with channel count and sample rate
//! - [`ChannelMode`] - which physical channel carries / receives the stimulus
//! - [`routing`] - panning a mono stimulus to stereo and extracting the analysis channel
//! - [`Error`] - the measurement error taxonomy
//! - [`db_to_linear`] / [`linear_to_db`] - decibel helpers
//!
//! # Example
//!
//! ```rust
//! use micprobe_core::{ChannelMode, Signal, routing};
//!
//! let mono = Signal::mono(vec![0.5, -0.5, 0.25], 48000).unwrap();
//! let stereo = routing::pan(&mono, ChannelMode::Left);
//! let back = routing::extract(&stereo, ChannelMode::Left);
//! assert_eq!(back.samples(), mono.samples());
//! ```

mod error;
mod math;
mod signal;

pub mod routing;

pub use error::{Error, Result};
pub use math::{DB_FLOOR, db_to_linear, linear_to_db};
pub use routing::ChannelMode;
pub use signal::Signal;
