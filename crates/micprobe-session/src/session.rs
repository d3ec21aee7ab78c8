//! The measurement orchestrator.

use crate::pipeline::{AnalysisOptions, CurveSet, analyze_takes};
use crate::state::SessionState;
use crate::{Result, SessionError};
use micprobe_analysis::{FrequencyCurve, Stimulus, StimulusGenerator, StimulusKind};
use micprobe_config::{AnomalyPolicy, Settings, TransportConfig};
use micprobe_core::{Signal, routing};
use micprobe_io::{
    CaptureTruncated, DeviceHandle, DuplexBackend, DuplexTransport, StopSignal, TransportSettings,
};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Transport timing derived from the transport section of the settings.
pub fn transport_settings(config: &TransportConfig) -> TransportSettings {
    TransportSettings {
        block_size: config.block_size,
        poll_interval: config.poll_interval(),
        stall_timeout: config.stall_timeout(),
        input_channels: config.input_channels,
        output_channels: config.output_channels,
    }
}

/// One completed play-and-record cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Take {
    /// 1-based position in the take set.
    pub index: usize,
    /// Captured signal after channel extraction.
    pub signal: Signal,
    /// Time since the session was created when the take finished.
    pub elapsed: Duration,
    /// Set when the operator stopped the cycle early.
    pub truncated: Option<CaptureTruncated>,
    /// Input frames the device lost during the take, recorded as silence.
    pub dropped_frames: usize,
}

/// What the caller should do with a measured take set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Keep the take set. `anomalies` is non-empty only under
    /// [`AnomalyPolicy::Accept`]. Takes that lost input frames count as
    /// anomalous alongside the statistical outliers.
    Accepted {
        /// Anomalous takes that were accepted anyway.
        anomalies: BTreeSet<usize>,
    },
    /// Discard the take set and record again.
    RetryRequested {
        /// Anomalous takes that triggered the retry.
        anomalies: BTreeSet<usize>,
    },
    /// The operator stopped recording; nothing was analysed.
    Cancelled,
}

/// Everything a measurement produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementOutcome {
    /// Recorded takes, including a truncated last take after cancellation.
    pub takes: Vec<Take>,
    /// Curves and statistics, absent when cancelled.
    pub analysis: Option<CurveSet>,
    /// Policy decision.
    pub decision: Decision,
}

/// Drives sequential takes for one microphone on one device pair.
///
/// The device pair is checked for host compatibility and the settings are
/// validated once, when the session is created.
pub struct MeasurementSession<'a> {
    transport: DuplexTransport<'a>,
    settings: Settings,
    generator: StimulusGenerator,
    state: SessionState,
    stop: StopSignal,
    started: Instant,
}

impl std::fmt::Debug for MeasurementSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementSession")
            .field("state", &self.state)
            .field("sample_rate", &self.settings.measurement.sample_rate)
            .finish_non_exhaustive()
    }
}

impl<'a> MeasurementSession<'a> {
    /// Validate `settings` and bind the device pair.
    pub fn new(
        backend: &'a dyn DuplexBackend,
        input: DeviceHandle,
        output: DeviceHandle,
        settings: Settings,
    ) -> Result<Self> {
        settings.validate()?;
        let transport = DuplexTransport::new(
            backend,
            input,
            output,
            settings.measurement.sample_rate,
            transport_settings(&settings.transport),
        )?;

        let mut generator = StimulusGenerator::new(settings.measurement.sample_rate);
        if let Some(seed) = settings.stimulus.seed {
            generator = generator.with_seed(seed);
        }

        tracing::info!(
            sample_rate = settings.measurement.sample_rate,
            takes = settings.measurement.take_count,
            policy = %settings.measurement.anomaly_policy,
            "measurement session created"
        );

        Ok(Self {
            transport,
            settings,
            generator,
            state: SessionState::Idle,
            stop: StopSignal::new(),
            started: Instant::now(),
        })
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Settings the session was created with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Handle for an operator thread to stop recording.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Return to `Idle` and clear any pending stop request.
    pub fn reset(&mut self) {
        self.stop.reset();
        self.enter(SessionState::Idle);
    }

    /// Generate a stimulus of `kind` from the stimulus settings.
    pub fn stimulus(&self, kind: StimulusKind) -> Result<Stimulus> {
        let s = &self.settings.stimulus;
        Ok(self
            .generator
            .generate(kind, s.duration_secs, s.f_start, s.f_end)?)
    }

    /// Record `count` takes of `stimulus`, one cycle after another.
    ///
    /// Stops early, without error, when the stop signal is set; the last take
    /// then carries a [`CaptureTruncated`] marker. The session is back in
    /// `Idle` afterwards.
    pub fn record_takes(&mut self, stimulus: &Stimulus, count: usize) -> Result<Vec<Take>> {
        let takes = self.record(stimulus, count);
        self.enter(SessionState::Idle);
        takes
    }

    /// Record the configured number of takes, analyse them and apply the
    /// anomaly policy.
    ///
    /// `reference` is a smoothed reference-microphone curve to normalize
    /// against. A retry decision is only advice: the caller discards the
    /// takes and calls `measure` again if it wants another attempt.
    pub fn measure(
        &mut self,
        stimulus: &Stimulus,
        reference: Option<&FrequencyCurve>,
    ) -> Result<MeasurementOutcome> {
        let count = self.settings.measurement.take_count;
        let takes = match self.record(stimulus, count) {
            Ok(takes) => takes,
            Err(e) => {
                self.enter(SessionState::Idle);
                return Err(e);
            }
        };

        let cancelled = takes.len() < count || takes.iter().any(|t| t.truncated.is_some());
        if cancelled {
            tracing::warn!(recorded = takes.len(), requested = count, "measurement cancelled");
            self.enter(SessionState::Idle);
            return Ok(MeasurementOutcome {
                takes,
                analysis: None,
                decision: Decision::Cancelled,
            });
        }

        self.enter(SessionState::Aggregating);
        let options = AnalysisOptions::from(&self.settings);
        let signals = takes.iter().map(|t| &t.signal);
        let analysis = match analyze_takes(signals, stimulus, &options, reference) {
            Ok(analysis) => analysis,
            Err(e) => {
                self.enter(SessionState::Idle);
                return Err(e);
            }
        };

        let mut anomalies = analysis.aggregate.anomalies.clone();
        for take in takes.iter().filter(|t| t.dropped_frames > 0) {
            tracing::warn!(
                take = take.index,
                dropped_frames = take.dropped_frames,
                "take lost input frames"
            );
            anomalies.insert(take.index);
        }
        let decision = match (anomalies.is_empty(), self.settings.measurement.anomaly_policy) {
            (true, _) => Decision::Accepted { anomalies },
            (false, AnomalyPolicy::Accept) => {
                tracing::warn!(?anomalies, "anomalous takes accepted by policy");
                Decision::Accepted { anomalies }
            }
            (false, AnomalyPolicy::Retry) => Decision::RetryRequested { anomalies },
        };

        self.enter(match &decision {
            Decision::RetryRequested { anomalies } => SessionState::RetryRequested {
                anomalies: anomalies.clone(),
            },
            _ => SessionState::Accepted,
        });

        Ok(MeasurementOutcome {
            takes,
            analysis: Some(analysis),
            decision,
        })
    }

    /// Single-shot capture of a noise or silence stimulus, without
    /// aggregation, for use as a reference floor.
    pub fn capture_noise_sample(&mut self, kind: StimulusKind) -> Result<Take> {
        let stimulus = self.stimulus(kind)?;
        let mut takes = self.record_takes(&stimulus, 1)?;
        takes.pop().ok_or_else(|| {
            micprobe_core::Error::invalid("recording was stopped before it started").into()
        })
    }

    fn record(&mut self, stimulus: &Stimulus, count: usize) -> Result<Vec<Take>> {
        if !self.state.can_record() {
            return Err(SessionError::InvalidState {
                state: self.state.to_string(),
                action: "record",
            });
        }
        self.enter(SessionState::Recording(stimulus.kind()));

        let m = &self.settings.measurement;
        let playback = routing::pan(
            &stimulus.signal().scaled(self.settings.transport.output_gain),
            m.output_channel,
        );
        let input_channel = m.input_channel;

        let mut takes = Vec::with_capacity(count);
        for index in 1..=count {
            if self.stop.is_stopped() {
                tracing::info!(index, "stop requested before take");
                break;
            }

            tracing::info!(index, count, kind = %stimulus.kind(), "recording take");
            let capture = self.transport.run(&playback, &self.stop)?;
            let take = Take {
                index,
                signal: routing::extract(&capture.signal, input_channel),
                elapsed: self.started.elapsed(),
                truncated: capture.truncated,
                dropped_frames: capture.dropped_frames,
            };
            let stop_now = take.truncated.is_some();
            takes.push(take);
            if stop_now {
                break;
            }
        }
        Ok(takes)
    }

    fn enter(&mut self, next: SessionState) {
        if self.state != next {
            tracing::info!(from = %self.state, to = %next, "session state");
            self.state = next;
        }
    }
}
