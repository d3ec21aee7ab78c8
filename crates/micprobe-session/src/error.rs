//! Session error type.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by a measurement session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A measurement precondition or numeric operation failed.
    #[error(transparent)]
    Measurement(#[from] micprobe_core::Error),

    /// Audio I/O failed (stream, device, WAV).
    #[error(transparent)]
    Audio(micprobe_io::Error),

    /// Settings did not validate.
    #[error("invalid settings: {0}")]
    Settings(#[from] micprobe_config::ValidationError),

    /// The requested operation is not allowed in the current state.
    #[error("cannot {action} while {state}")]
    InvalidState {
        /// State the session was in.
        state: String,
        /// What was attempted.
        action: &'static str,
    },

    /// A take directory held no `mic_take_<n>.wav` files.
    #[error("no take files (mic_take_<n>.wav) in '{}'", .0.display())]
    NoTakes(PathBuf),
}

// Precondition failures raised by the transport surface as measurement errors
impl From<micprobe_io::Error> for SessionError {
    fn from(err: micprobe_io::Error) -> Self {
        match err {
            micprobe_io::Error::Core(core) => SessionError::Measurement(core),
            other => SessionError::Audio(other),
        }
    }
}

/// Convenience result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
