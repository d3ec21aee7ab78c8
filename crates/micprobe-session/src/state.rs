//! Session state machine.

use micprobe_analysis::StimulusKind;
use std::collections::BTreeSet;
use std::fmt;

/// Where a measurement session is in its cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Ready to record.
    #[default]
    Idle,
    /// Playing `kind` and capturing takes.
    Recording(StimulusKind),
    /// Turning takes into curves and statistics.
    Aggregating,
    /// The last take set was accepted.
    Accepted,
    /// The last take set should be discarded and recorded again.
    RetryRequested {
        /// 1-based indices of the anomalous takes.
        anomalies: BTreeSet<usize>,
    },
}

impl SessionState {
    /// Whether a new recording may begin from this state.
    pub fn can_record(&self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Accepted | SessionState::RetryRequested { .. }
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::Recording(kind) => write!(f, "recording {kind}"),
            SessionState::Aggregating => f.write_str("aggregating"),
            SessionState::Accepted => f.write_str("accepted"),
            SessionState::RetryRequested { anomalies } => {
                write!(f, "retry requested (takes {anomalies:?})")
            }
        }
    }
}
