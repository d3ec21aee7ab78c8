//! Error taxonomy shared by every measurement stage.

use thiserror::Error;

/// Errors raised by measurement operations.
///
/// All variants are fatal to the call that produced them. A truncated capture
/// is deliberately not represented here: it is an advisory value carried next
/// to the partial data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A generation or analysis request had malformed parameters.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Stimulus and session disagree on the sample rate.
    #[error("sample rate mismatch: expected {expected} Hz, got {actual} Hz")]
    SampleRateMismatch {
        /// Sample rate declared by the session.
        expected: u32,
        /// Sample rate of the offending signal.
        actual: u32,
    },

    /// Input and output devices live on different host transports.
    #[error("incompatible devices: input uses host '{input_host}', output uses host '{output_host}'")]
    IncompatibleDevices {
        /// Host API of the input device.
        input_host: String,
        /// Host API of the output device.
        output_host: String,
    },

    /// Curves or signals with differing lengths were combined.
    #[error("shape mismatch: expected {expected} bins, got {actual}")]
    ShapeMismatch {
        /// Length of the first (reference) operand.
        expected: usize,
        /// Length of the mismatching operand.
        actual: usize,
    },
}

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidParameter(reason.into())
    }
}

/// Convenience result type for measurement operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_factory_produces_correct_variant() {
        let err = Error::invalid("duration must be positive");
        assert_eq!(
            err,
            Error::InvalidParameter("duration must be positive".to_string())
        );
    }

    #[test]
    fn sample_rate_mismatch_display() {
        let err = Error::SampleRateMismatch {
            expected: 48000,
            actual: 44100,
        };
        assert_eq!(
            err.to_string(),
            "sample rate mismatch: expected 48000 Hz, got 44100 Hz"
        );
    }

    #[test]
    fn incompatible_devices_display_names_both_hosts() {
        let err = Error::IncompatibleDevices {
            input_host: "ALSA".to_string(),
            output_host: "JACK".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ALSA"), "got: {msg}");
        assert!(msg.contains("JACK"), "got: {msg}");
    }

    #[test]
    fn shape_mismatch_display() {
        let err = Error::ShapeMismatch {
            expected: 513,
            actual: 257,
        };
        assert_eq!(err.to_string(), "shape mismatch: expected 513 bins, got 257");
    }
}
