//! cpal-based duplex backend.
//!
//! [`CpalBackend`] enumerates devices on every host cpal can reach (not just
//! the default one), so a user can pick an input/output pair that lives on the
//! same host. Duplex operation is built from one input stream and one output
//! stream on that host, bridged by a bounded channel: the input callback
//! forwards captured blocks and the output callback pairs them with the block
//! it is about to play before invoking the user callback.
//!
//! The bridge never shifts captured audio in time. A block that finds the
//! channel full is replaced by silence of the same length ahead of the next
//! block that gets through. Backlog beyond [`BRIDGE_BLOCKS`] blocks is
//! discarded oldest first. Both cases add to the stream's dropped-frame
//! counter, which the transport reports with the capture.

use crate::backend::{
    DeviceHandle, DeviceInfo, DuplexBackend, DuplexCallback, DuplexConfig, ErrorCallback,
    StreamHandle,
};
use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, HostId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};

/// Input blocks the bridge holds before the oldest are discarded.
pub const BRIDGE_BLOCKS: usize = 8;

/// Extract device name via `description()` (cpal 0.17+).
fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// cpal-based audio backend spanning all available hosts.
#[derive(Debug, Default)]
pub struct CpalBackend;

impl CpalBackend {
    /// Create a new cpal backend.
    pub fn new() -> Self {
        tracing::info!(
            default_host = cpal::default_host().id().name(),
            hosts = cpal::available_hosts().len(),
            "cpal backend initialized"
        );
        Self
    }

    fn host(name: &str) -> Result<Host> {
        let id: HostId = cpal::available_hosts()
            .into_iter()
            .find(|id| id.name() == name)
            .ok_or_else(|| Error::DeviceNotFound(format!("no audio host named '{name}'")))?;
        cpal::host_from_id(id).map_err(|e| Error::Stream(e.to_string()))
    }

    /// Look up a device by host and index, checking the name still matches.
    fn device(handle: &DeviceHandle) -> Result<Device> {
        let host = Self::host(&handle.host)?;
        let device = host
            .devices()
            .map_err(|e| Error::Stream(e.to_string()))?
            .nth(handle.index)
            .ok_or_else(|| Error::DeviceNotFound(handle.to_string()))?;

        match device_name(&device) {
            Ok(name) if name == handle.name => Ok(device),
            Ok(name) => Err(Error::DeviceNotFound(format!(
                "{handle} (index now holds '{name}')"
            ))),
            Err(e) => Err(Error::Stream(e.to_string())),
        }
    }

    fn index_of(host: &Host, target: &Device) -> Option<DeviceHandle> {
        let target_name = device_name(target).ok()?;
        let index = host
            .devices()
            .ok()?
            .position(|d| device_name(&d).is_ok_and(|n| n == target_name))?;
        Some(DeviceHandle::new(host.id().name(), index, target_name))
    }
}

impl DuplexBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let mut devices = Vec::new();

        for id in cpal::available_hosts() {
            let host = match cpal::host_from_id(id) {
                Ok(host) => host,
                Err(e) => {
                    tracing::debug!(host = id.name(), error = %e, "host unavailable");
                    continue;
                }
            };
            let Ok(host_devices) = host.devices() else {
                continue;
            };

            for (index, device) in host_devices.enumerate() {
                let Ok(name) = device_name(&device) else {
                    continue;
                };
                let input = device.default_input_config().ok();
                let output = device.default_output_config().ok();
                let default_sample_rate = input
                    .as_ref()
                    .or(output.as_ref())
                    .map_or(48000, |c| c.sample_rate());

                devices.push(DeviceInfo {
                    handle: DeviceHandle::new(id.name(), index, name),
                    is_input: input.is_some(),
                    is_output: output.is_some(),
                    default_sample_rate,
                });
            }
        }

        Ok(devices)
    }

    fn default_devices(&self) -> Result<(Option<DeviceHandle>, Option<DeviceHandle>)> {
        let host = cpal::default_host();
        let input = host
            .default_input_device()
            .and_then(|d| Self::index_of(&host, &d));
        let output = host
            .default_output_device()
            .and_then(|d| Self::index_of(&host, &d));
        Ok((input, output))
    }

    fn open_duplex(
        &self,
        config: &DuplexConfig,
        callback: DuplexCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        let input_device = Self::device(&config.input)?;
        let output_device = Self::device(&config.output)?;

        let input_config = cpal::StreamConfig {
            channels: config.input_channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.block_size),
        };
        let output_config = cpal::StreamConfig {
            channels: config.output_channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.block_size),
        };

        // Both cpal error callbacks report through the one caller-supplied sink
        let errors = Arc::new(Mutex::new(error_callback));
        let input_errors = Arc::clone(&errors);
        let output_errors = errors;

        let dropped = Arc::new(AtomicUsize::new(0));
        let (mut bridge_in, mut bridge_out) = bridge(
            config.input_channels as usize,
            config.block_size as usize,
            Arc::clone(&dropped),
        );

        let input_stream = input_device
            .build_input_stream(
                &input_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| bridge_in.push(data),
                move |err| {
                    if let Ok(mut report) = input_errors.lock() {
                        report(&format!("input: {err}"));
                    }
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        let output_channels = config.output_channels as usize;
        let mut callback = callback;
        let mut input_block: Vec<f32> = Vec::new();

        let output_stream = output_device
            .build_output_stream(
                &output_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    bridge_out.take_block(data.len() / output_channels, &mut input_block);
                    callback(&input_block, data);
                },
                move |err| {
                    if let Ok(mut report) = output_errors.lock() {
                        report(&format!("output: {err}"));
                    }
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        input_stream
            .play()
            .map_err(|e| Error::Stream(e.to_string()))?;
        output_stream
            .play()
            .map_err(|e| Error::Stream(e.to_string()))?;

        tracing::info!(
            host = %config.input.host,
            input = %config.input.name,
            output = %config.output.name,
            sample_rate = config.sample_rate,
            block_size = config.block_size,
            "duplex stream started"
        );

        Ok(StreamHandle::new((input_stream, output_stream)).with_dropped_frames(dropped))
    }
}

/// One captured block in flight, preceded by `gap` samples that were lost
/// because the channel was full.
struct BridgeBlock {
    gap: usize,
    samples: Vec<f32>,
}

/// Input-callback end of the bridge.
struct BridgeInput {
    tx: SyncSender<BridgeBlock>,
    lost: usize,
    channels: usize,
    dropped: Arc<AtomicUsize>,
}

impl BridgeInput {
    fn push(&mut self, data: &[f32]) {
        let block = BridgeBlock {
            gap: self.lost,
            samples: data.to_vec(),
        };
        match self.tx.try_send(block) {
            Ok(()) => self.lost = 0,
            Err(TrySendError::Full(block)) => {
                self.lost += block.samples.len();
                self.dropped
                    .fetch_add(block.samples.len() / self.channels, Ordering::AcqRel);
            }
            // Output side is gone; the stream is shutting down
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Output-callback end of the bridge.
struct BridgeOutput {
    rx: Receiver<BridgeBlock>,
    pending: Vec<f32>,
    channels: usize,
    limit: usize,
    dropped: Arc<AtomicUsize>,
}

impl BridgeOutput {
    /// Fill `block` with `frames` frames of input, silence where none has
    /// arrived yet.
    fn take_block(&mut self, frames: usize, block: &mut Vec<f32>) {
        while let Ok(BridgeBlock { gap, samples }) = self.rx.try_recv() {
            self.pending.resize(self.pending.len() + gap, 0.0);
            self.pending.extend(samples);
        }

        let needed = frames * self.channels;
        let limit = self.limit.max(needed);
        if self.pending.len() > limit {
            let excess = (self.pending.len() - limit).div_ceil(self.channels) * self.channels;
            let excess = excess.min(self.pending.len());
            self.pending.drain(..excess);
            self.dropped
                .fetch_add(excess / self.channels, Ordering::AcqRel);
        }

        let available = needed.min(self.pending.len());
        block.clear();
        block.extend(self.pending.drain(..available));
        block.resize(needed, 0.0);
    }
}

/// Bounded input-to-output bridge for `channels`-channel input in blocks of
/// `block_frames` frames.
fn bridge(
    channels: usize,
    block_frames: usize,
    dropped: Arc<AtomicUsize>,
) -> (BridgeInput, BridgeOutput) {
    let (tx, rx) = mpsc::sync_channel(BRIDGE_BLOCKS);
    (
        BridgeInput {
            tx,
            lost: 0,
            channels,
            dropped: Arc::clone(&dropped),
        },
        BridgeOutput {
            rx,
            pending: Vec::new(),
            channels,
            limit: BRIDGE_BLOCKS * block_frames * channels,
            dropped,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpal_backend_name() {
        assert_eq!(CpalBackend::new().name(), "cpal");
    }

    #[test]
    fn cpal_backend_list_devices() {
        // Should not panic; device availability depends on the system.
        assert!(CpalBackend::new().list_devices().is_ok());
    }

    fn block(frames: usize, value: f32) -> Vec<f32> {
        vec![value; frames * 2]
    }

    #[test]
    fn bridge_passes_blocks_in_order() {
        let dropped = Arc::new(AtomicUsize::new(0));
        let (mut input, mut output) = bridge(2, 4, Arc::clone(&dropped));
        let mut out = Vec::new();

        output.take_block(4, &mut out);
        assert_eq!(out, block(4, 0.0), "no input yet reads as silence");

        input.push(&block(4, 1.0));
        input.push(&block(4, 2.0));
        output.take_block(4, &mut out);
        assert_eq!(out, block(4, 1.0));
        output.take_block(4, &mut out);
        assert_eq!(out, block(4, 2.0));
        assert_eq!(dropped.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn full_channel_leaves_a_silent_gap_in_place() {
        let dropped = Arc::new(AtomicUsize::new(0));
        let (mut input, mut output) = bridge(2, 4, Arc::clone(&dropped));

        // Fill the channel, then lose one block
        for n in 1..=BRIDGE_BLOCKS {
            input.push(&block(4, n as f32));
        }
        input.push(&block(4, 99.0));
        assert_eq!(dropped.load(Ordering::SeqCst), 4);

        let mut out = Vec::new();
        let mut seen = Vec::new();
        for _ in 0..2 {
            output.take_block(4, &mut out);
            seen.push(out[0]);
        }
        input.push(&block(4, 10.0));
        for _ in 0..BRIDGE_BLOCKS {
            output.take_block(4, &mut out);
            seen.push(out[0]);
        }

        // The lost block reads as silence between block 8 and block 10
        let mut expected: Vec<f32> = (1..=BRIDGE_BLOCKS).map(|n| n as f32).collect();
        expected.extend([0.0, 10.0]);
        assert_eq!(seen, expected);
        assert_eq!(dropped.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn backlog_is_bounded_and_counted() {
        let dropped = Arc::new(AtomicUsize::new(0));
        let (mut input, mut output) = bridge(2, 4, Arc::clone(&dropped));
        let mut out = Vec::new();

        // Input runs ahead of output: two blocks in for every block out
        for round in 0..(BRIDGE_BLOCKS * 4) {
            input.push(&block(4, round as f32));
            input.push(&block(4, round as f32));
            output.take_block(4, &mut out);
            assert!(output.pending.len() <= BRIDGE_BLOCKS * 4 * 2);
        }
        assert!(dropped.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn unknown_host_is_not_found() {
        let handle = DeviceHandle::new("NoSuchHost", 0, "nothing");
        assert!(matches!(
            CpalBackend::device(&handle),
            Err(Error::DeviceNotFound(_))
        ));
    }
}
