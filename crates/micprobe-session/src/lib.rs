//! Measurement orchestration for micprobe.
//!
//! [`MeasurementSession`] drives repeated duplex cycles for one microphone,
//! turns the takes into frequency curves, aggregates them and applies the
//! configured [`AnomalyPolicy`]. The numeric decision ([`Decision`]) is pure
//! data: the session never deletes files or retries on its own.
//!
//! ```text
//! Idle ──record──▶ Recording(kind) ──▶ Aggregating ──▶ Accepted
//!  ▲                                              └──▶ RetryRequested
//!  └──────────────────────── reset ─────────────────────────┘
//! ```
//!
//! Offline processing of recorded take files goes through [`analyze_takes`]
//! and [`load_take_dir`], the same pipeline the session uses after recording.

mod error;
mod pipeline;
mod session;
mod state;

pub use error::{Result, SessionError};
pub use micprobe_config::AnomalyPolicy;
pub use pipeline::{AnalysisOptions, CurveSet, analyze_takes, load_take_dir};
pub use session::{Decision, MeasurementOutcome, MeasurementSession, Take, transport_settings};
pub use state::SessionState;
