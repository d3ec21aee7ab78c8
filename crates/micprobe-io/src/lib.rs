//! Audio I/O layer for micprobe.
//!
//! This crate provides:
//!
//! - **Duplex transport**: [`DuplexTransport`] plays a panned stimulus while
//!   capturing the microphone, block by block, on any [`DuplexBackend`]
//! - **Backends**: [`CpalBackend`] for real hardware across every cpal host and
//!   [`LoopbackBackend`], a deterministic software loop for tests
//! - **WAV file I/O**: [`read_signal`] and [`write_signal`] for `Signal <-> file`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use micprobe_core::{routing, ChannelMode};
//! use micprobe_io::{CpalBackend, DuplexBackend, DuplexTransport, StopSignal, TransportSettings};
//!
//! let backend = CpalBackend::new();
//! let (input, output) = backend.default_devices()?;
//! let transport = DuplexTransport::new(
//!     &backend,
//!     input.ok_or(micprobe_io::Error::NoDevice)?,
//!     output.ok_or(micprobe_io::Error::NoDevice)?,
//!     48000,
//!     TransportSettings::default(),
//! )?;
//!
//! let panned = routing::pan(stimulus.signal(), ChannelMode::Left);
//! let capture = transport.run(&panned, &StopSignal::new())?;
//! ```

pub mod backend;
pub mod cpal_backend;
pub mod loopback;
pub mod transport;
mod wav;

pub use backend::{
    DeviceHandle, DeviceInfo, DuplexBackend, DuplexCallback, DuplexConfig, ErrorCallback,
    StreamHandle, resolve_device,
};
pub use cpal_backend::CpalBackend;
pub use loopback::LoopbackBackend;
pub use transport::{Capture, CaptureTruncated, DuplexTransport, StopSignal, TransportSettings};
pub use wav::{WavFormat, WavInfo, WavSpec, read_signal, read_wav_info, write_signal};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A measurement precondition failed (rate mismatch, incompatible devices).
    #[error(transparent)]
    Core(#[from] micprobe_core::Error),

    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The hardware callback stopped advancing while the stream was open.
    #[error("Audio stream stalled at frame {frame} (no progress for {stalled_ms} ms)")]
    StreamStalled {
        /// Cursor position when progress stopped.
        frame: usize,
        /// How long the cursor sat still before giving up.
        stalled_ms: u64,
    },

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
