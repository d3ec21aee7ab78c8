//! Deterministic software loopback backend.
//!
//! [`LoopbackBackend`] stands in for a loudspeaker and microphone wired
//! back-to-back. Each opened stream runs the duplex callback on a dedicated
//! thread at a fixed block pace and routes what was played back into the
//! input, delayed and scaled. It makes the transport testable without
//! hardware, and the echo path is exact: the input a block receives is the
//! output of earlier blocks, multiplied by `gain`.
//!
//! The round-trip delay is `block_size + latency_frames` frames. A block's
//! input can never contain that same block's output, just like a real duplex
//! device.

use crate::backend::{
    DeviceHandle, DeviceInfo, DuplexBackend, DuplexCallback, DuplexConfig, ErrorCallback,
    StreamHandle,
};
use crate::{Error, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// Host name reported for loopback devices.
pub const LOOPBACK_HOST: &str = "Loopback";

/// Software loopback backend for hardware-free testing.
#[derive(Debug, Clone)]
pub struct LoopbackBackend {
    host: String,
    latency_frames: usize,
    gain: f32,
    block_interval: Duration,
    stall_after_blocks: Option<usize>,
    streams_opened: Arc<AtomicUsize>,
}

impl LoopbackBackend {
    /// Unity-gain loopback with no extra latency, running a block per millisecond.
    pub fn new() -> Self {
        Self {
            host: LOOPBACK_HOST.to_string(),
            latency_frames: 0,
            gain: 1.0,
            block_interval: Duration::from_millis(1),
            stall_after_blocks: None,
            streams_opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Report devices under a different host name.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Add latency on top of the one-block round trip.
    pub fn with_latency(mut self, frames: usize) -> Self {
        self.latency_frames = frames;
        self
    }

    /// Scale the echoed signal.
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    /// Wall-clock time between callback invocations.
    pub fn with_block_interval(mut self, interval: Duration) -> Self {
        self.block_interval = interval;
        self
    }

    /// Stop invoking the callback after `blocks` blocks, simulating a device
    /// that hangs while its stream stays open.
    pub fn with_stall_after(mut self, blocks: usize) -> Self {
        self.stall_after_blocks = Some(blocks);
        self
    }

    /// Number of streams opened so far.
    pub fn streams_opened(&self) -> usize {
        self.streams_opened.load(Ordering::SeqCst)
    }

    /// Handle of the single loopback device.
    pub fn device(&self) -> DeviceHandle {
        DeviceHandle::new(self.host.clone(), 0, "Loopback")
    }
}

impl Default for LoopbackBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Running loopback stream; stops and joins its thread on drop.
struct LoopbackStream {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for LoopbackStream {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("loopback stream thread panicked");
        }
    }
}

impl DuplexBackend for LoopbackBackend {
    fn name(&self) -> &'static str {
        "loopback"
    }

    fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(vec![DeviceInfo {
            handle: self.device(),
            is_input: true,
            is_output: true,
            default_sample_rate: 48000,
        }])
    }

    fn default_devices(&self) -> Result<(Option<DeviceHandle>, Option<DeviceHandle>)> {
        Ok((Some(self.device()), Some(self.device())))
    }

    fn open_duplex(
        &self,
        config: &DuplexConfig,
        callback: DuplexCallback,
        // Loopback streams never report runtime errors
        _error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        for handle in [&config.input, &config.output] {
            if *handle != self.device() {
                return Err(Error::DeviceNotFound(handle.to_string()));
            }
        }
        if config.block_size == 0 || config.input_channels == 0 || config.output_channels == 0 {
            return Err(Error::Stream(
                "block size and channel counts must be positive".to_string(),
            ));
        }

        self.streams_opened.fetch_add(1, Ordering::SeqCst);
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let echo = Echo {
            block_frames: config.block_size as usize,
            input_channels: config.input_channels as usize,
            output_channels: config.output_channels as usize,
            latency_frames: self.latency_frames,
            gain: self.gain,
        };
        let interval = self.block_interval;
        let stall_after = self.stall_after_blocks;

        let thread = std::thread::Builder::new()
            .name("micprobe-loopback".to_string())
            .spawn(move || echo.run(callback, &thread_stop, interval, stall_after))
            .map_err(|e| Error::Stream(e.to_string()))?;

        tracing::debug!(
            block_size = config.block_size,
            latency_frames = self.latency_frames,
            "loopback stream started"
        );

        Ok(StreamHandle::new(LoopbackStream {
            stop,
            thread: Some(thread),
        }))
    }
}

/// Callback pump state for one loopback stream.
struct Echo {
    block_frames: usize,
    input_channels: usize,
    output_channels: usize,
    latency_frames: usize,
    gain: f32,
}

impl Echo {
    fn run(
        &self,
        mut callback: DuplexCallback,
        stop: &AtomicBool,
        interval: Duration,
        stall_after: Option<usize>,
    ) {
        let block_in = self.block_frames * self.input_channels;
        let mut line: VecDeque<f32> =
            VecDeque::from(vec![0.0; (self.block_frames + self.latency_frames) * self.input_channels]);
        let mut input = vec![0.0f32; block_in];
        let mut output = vec![0.0f32; self.block_frames * self.output_channels];
        let mut blocks = 0usize;

        while !stop.load(Ordering::SeqCst) {
            if stall_after.is_some_and(|limit| blocks >= limit) {
                std::thread::sleep(interval);
                continue;
            }

            for (slot, sample) in input.iter_mut().zip(line.drain(..block_in)) {
                *slot = sample;
            }
            output.fill(0.0);
            callback(&input, &mut output);

            for frame in output.chunks_exact(self.output_channels) {
                for ch in 0..self.input_channels {
                    let source = frame[ch.min(self.output_channels - 1)];
                    line.push_back(source * self.gain);
                }
            }

            blocks += 1;
            std::thread::sleep(interval);
        }
    }
}
