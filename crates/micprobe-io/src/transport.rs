//! One hardware-paced playback + capture cycle.
//!
//! [`DuplexTransport`] owns the bookkeeping for a single cycle: a frame cursor
//! shared with the audio callback and a capture buffer sized to the stimulus.
//! Each callback invocation plays the next block of the stimulus (zero-padded
//! past its end), stores the matching block of input at the same cursor
//! offset (clipped at the buffer end) and advances the cursor by the block
//! length. The calling thread only polls the cursor; it reads the capture
//! buffer after the stream handle has been dropped, which is the one
//! synchronization point between the two threads.

use crate::backend::{DeviceHandle, DuplexBackend, DuplexConfig};
use crate::{Error, Result};
use micprobe_core::Signal;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Cooperative cancellation flag shared with an operator thread.
///
/// Clones share the same flag. Setting it ends the current cycle within one
/// poll interval.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Create an unset signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the running cycle stop.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag before the next cycle.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Timing knobs for a transport cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSettings {
    /// Requested hardware block size in frames.
    pub block_size: u32,
    /// Interval between cursor polls on the controlling thread.
    pub poll_interval: Duration,
    /// How long the cursor may sit still before the stream counts as stalled.
    pub stall_timeout: Duration,
    /// Interleaved input channel count to open.
    pub input_channels: u16,
    /// Interleaved output channel count to open; played signals must match.
    pub output_channels: u16,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            block_size: 1024,
            poll_interval: Duration::from_millis(50),
            stall_timeout: Duration::from_millis(2000),
            input_channels: 2,
            output_channels: 2,
        }
    }
}

/// Advisory marker: the cycle was cancelled before the stimulus finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTruncated {
    /// Frames actually captured.
    pub captured_frames: usize,
    /// Frames the stimulus called for.
    pub expected_frames: usize,
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    /// Captured input, same frame count as the stimulus, zero past any
    /// cancellation point.
    pub signal: Signal,
    /// Present when the cycle was cancelled early.
    pub truncated: Option<CaptureTruncated>,
    /// Input frames the backend lost and replaced with silence.
    pub dropped_frames: usize,
}

impl Capture {
    /// Whether the whole stimulus was captured.
    pub fn is_complete(&self) -> bool {
        self.truncated.is_none()
    }

    /// Whether every captured frame came from the device.
    pub fn is_intact(&self) -> bool {
        self.dropped_frames == 0
    }
}

/// Copy the stimulus block starting at `offset` into `output`, zero-padding
/// past the end of the stimulus.
pub(crate) fn fill_block(stimulus: &[f32], offset: usize, output: &mut [f32]) {
    let available = stimulus.len().saturating_sub(offset).min(output.len());
    if available > 0 {
        output[..available].copy_from_slice(&stimulus[offset..offset + available]);
    }
    output[available..].fill(0.0);
}

/// Store an input block at `offset`, dropping whatever does not fit.
pub(crate) fn store_block(capture: &mut [f32], offset: usize, input: &[f32]) {
    let room = capture.len().saturating_sub(offset).min(input.len());
    if room > 0 {
        capture[offset..offset + room].copy_from_slice(&input[..room]);
    }
}

/// Synchronous playback + capture against one device pair.
///
/// Construction checks that both devices share a host transport, so an
/// incompatible pair fails before any stream exists.
pub struct DuplexTransport<'a> {
    backend: &'a dyn DuplexBackend,
    input: DeviceHandle,
    output: DeviceHandle,
    sample_rate: u32,
    settings: TransportSettings,
}

impl<'a> DuplexTransport<'a> {
    /// Bind a device pair on `backend` at `sample_rate`.
    pub fn new(
        backend: &'a dyn DuplexBackend,
        input: DeviceHandle,
        output: DeviceHandle,
        sample_rate: u32,
        settings: TransportSettings,
    ) -> Result<Self> {
        if !input.is_compatible_with(&output) {
            return Err(micprobe_core::Error::IncompatibleDevices {
                input_host: input.host,
                output_host: output.host,
            }
            .into());
        }
        if settings.block_size == 0 || settings.input_channels == 0 || settings.output_channels == 0
        {
            return Err(micprobe_core::Error::invalid(
                "block size and channel counts must be positive",
            )
            .into());
        }
        Ok(Self {
            backend,
            input,
            output,
            sample_rate,
            settings,
        })
    }

    /// Sample rate the transport was bound at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Timing settings in use.
    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    /// Play `stimulus` (already panned to the output layout) and capture the
    /// input until the stimulus is exhausted or `stop` is set.
    ///
    /// A cancelled cycle still returns `Ok`, with [`Capture::truncated`] set.
    pub fn run(&self, stimulus: &Signal, stop: &StopSignal) -> Result<Capture> {
        stimulus.ensure_sample_rate(self.sample_rate)?;
        let output_channels = self.settings.output_channels;
        if stimulus.channels() != output_channels {
            return Err(micprobe_core::Error::invalid(format!(
                "stimulus has {} channel(s), output is opened with {output_channels}",
                stimulus.channels()
            ))
            .into());
        }

        let expected_frames = stimulus.frames();
        let input_channels = self.settings.input_channels;

        let cursor = Arc::new(AtomicUsize::new(0));
        let capture = Arc::new(Mutex::new(vec![
            0.0f32;
            expected_frames * input_channels as usize
        ]));

        let callback = {
            let cursor = Arc::clone(&cursor);
            let capture = Arc::clone(&capture);
            let playback = stimulus.samples().to_vec();
            let out_ch = output_channels as usize;
            let in_ch = input_channels as usize;
            Box::new(move |input: &[f32], output: &mut [f32]| {
                let frame = cursor.load(Ordering::Acquire);
                let delivered = output.len() / out_ch;
                fill_block(&playback, frame * out_ch, output);
                // Uncontended while the stream runs: the controller never locks
                // until the stream is closed
                if let Ok(mut buffer) = capture.try_lock() {
                    store_block(&mut buffer, frame * in_ch, input);
                }
                cursor.store(frame + delivered, Ordering::Release);
            })
        };

        let config = DuplexConfig {
            input: self.input.clone(),
            output: self.output.clone(),
            sample_rate: self.sample_rate,
            block_size: self.settings.block_size,
            input_channels,
            output_channels,
        };
        let stream = self.backend.open_duplex(
            &config,
            callback,
            Box::new(|message: &str| tracing::warn!(error = message, "audio stream error")),
        )?;

        tracing::debug!(
            frames = expected_frames,
            backend = self.backend.name(),
            "transport cycle started"
        );

        let mut last_frame = 0;
        let mut last_progress = Instant::now();
        let cancelled = loop {
            std::thread::sleep(self.settings.poll_interval);
            let frame = cursor.load(Ordering::Acquire);

            if frame >= expected_frames {
                break false;
            }
            if stop.is_stopped() {
                break true;
            }
            if frame != last_frame {
                last_frame = frame;
                last_progress = Instant::now();
            } else if last_progress.elapsed() >= self.settings.stall_timeout {
                drop(stream);
                let stalled_ms = last_progress.elapsed().as_millis() as u64;
                tracing::warn!(frame, stalled_ms, "audio stream stalled");
                return Err(Error::StreamStalled { frame, stalled_ms });
            }
        };

        // Closing the stream is the barrier: no callback runs past this point
        let dropped_frames = stream.close();

        let captured_frames = cursor.load(Ordering::Acquire).min(expected_frames);
        let samples = match capture.lock() {
            Ok(mut buffer) => std::mem::take(&mut *buffer),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        let signal = Signal::new(samples, input_channels, self.sample_rate)?;

        let truncated = (cancelled && captured_frames < expected_frames).then(|| {
            tracing::warn!(captured_frames, expected_frames, "capture truncated by stop request");
            CaptureTruncated {
                captured_frames,
                expected_frames,
            }
        });
        if dropped_frames > 0 {
            tracing::warn!(dropped_frames, "input frames lost during capture");
        }
        tracing::debug!(captured_frames, "transport cycle finished");

        Ok(Capture {
            signal,
            truncated,
            dropped_frames,
        })
    }
}
