//! Pluggable duplex audio backend abstraction.
//!
//! This module defines the [`DuplexBackend`] trait, which decouples the
//! measurement transport from any specific platform audio API. Two
//! implementations ship with the crate:
//!
//! - [`CpalBackend`](crate::CpalBackend) - real hardware on every cpal host
//!   (ALSA, JACK, CoreAudio, WASAPI, ASIO)
//! - [`LoopbackBackend`](crate::LoopbackBackend) - deterministic software loop
//!   for tests and CI
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │         DuplexTransport          │
//! │  cursor, capture buffer, polling │
//! └──────────────┬───────────────────┘
//!                │ uses DuplexBackend trait
//!                ▼
//! ┌──────────────────────────────────┐
//! │        DuplexBackend trait       │
//! │  list_devices / open_duplex      │
//! └──────────────┬───────────────────┘
//!                │ implemented by
//!        ┌───────┴────────┐
//!        ▼                ▼
//! ┌─────────────┐  ┌──────────────┐
//! │ CpalBackend │  │ Loopback     │
//! │             │  │ Backend      │
//! └─────────────┘  └──────────────┘
//! ```
//!
//! The trait uses a boxed callback rather than a generic parameter, so it is
//! object-safe and the transport can hold `&dyn DuplexBackend`. Streams come
//! back as a type-erased [`StreamHandle`] that stops the stream on drop.

use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Resolved identity of one audio device.
///
/// `host` names the underlying host transport (e.g. "ALSA", "JACK"). Two
/// devices can only form a duplex pair when their hosts match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    /// Host API name.
    pub host: String,
    /// Position of the device in its host's device list.
    pub index: usize,
    /// Human-readable device name.
    pub name: String,
}

impl DeviceHandle {
    /// Create a device handle.
    pub fn new(host: impl Into<String>, index: usize, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            index,
            name: name.into(),
        }
    }

    /// Whether this device shares a host transport with `other`.
    pub fn is_compatible_with(&self, other: &DeviceHandle) -> bool {
        self.host == other.host
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.host, self.index, self.name)
    }
}

/// Audio device information.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    /// Where the device lives.
    pub handle: DeviceHandle,
    /// Whether the device supports audio input.
    pub is_input: bool,
    /// Whether the device supports audio output.
    pub is_output: bool,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

/// Configuration for opening one duplex stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplexConfig {
    /// Capture device.
    pub input: DeviceHandle,
    /// Playback device.
    pub output: DeviceHandle,
    /// Sample rate in Hz for both directions.
    pub sample_rate: u32,
    /// Preferred block size in frames.
    pub block_size: u32,
    /// Interleaved channel count on the input side.
    pub input_channels: u16,
    /// Interleaved channel count on the output side.
    pub output_channels: u16,
}

/// Type-erased audio stream handle.
///
/// The stream is active while this handle exists; dropping it stops playback
/// and capture. Backends must not return from drop until their callback can no
/// longer run, which is what lets the transport read its capture buffer safely
/// afterwards.
///
/// Backends that can lose input (an overrun between separate input and output
/// streams) attach a counter with [`StreamHandle::with_dropped_frames`]; lost
/// frames are replaced by silence at their own position, never skipped.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
    dropped_frames: Option<Arc<AtomicUsize>>,
}

impl StreamHandle {
    /// Wrap a backend-specific stream object, kept alive until drop.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
            dropped_frames: None,
        }
    }

    /// Attach the counter the backend increments for every lost input frame.
    pub fn with_dropped_frames(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.dropped_frames = Some(counter);
        self
    }

    /// Input frames lost so far.
    pub fn dropped_frames(&self) -> usize {
        self.dropped_frames
            .as_ref()
            .map_or(0, |c| c.load(Ordering::Acquire))
    }

    /// Stop the stream and return the final lost-frame count.
    pub fn close(self) -> usize {
        let Self {
            _inner: stream,
            dropped_frames,
        } = self;
        drop(stream);
        dropped_frames.map_or(0, |c| c.load(Ordering::Acquire))
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("dropped_frames", &self.dropped_frames())
            .finish_non_exhaustive()
    }
}

/// Duplex block callback.
///
/// Called on the audio thread with one block of captured input and one output
/// buffer to fill. Both buffers are interleaved (`[L0, R0, L1, R1, ...]`) and
/// describe the same number of frames.
pub type DuplexCallback = Box<dyn FnMut(&[f32], &mut [f32]) + Send>;

/// Error callback signature, receiving a human-readable message.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Pluggable duplex audio backend.
pub trait DuplexBackend: Send {
    /// Human-readable backend name (e.g. "cpal", "loopback").
    fn name(&self) -> &str;

    /// List every device the backend can reach, across all of its hosts.
    fn list_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Default `(input, output)` devices, if any.
    fn default_devices(&self) -> Result<(Option<DeviceHandle>, Option<DeviceHandle>)>;

    /// Open a duplex stream and start invoking `callback` once per block.
    ///
    /// The caller guarantees `config.input` and `config.output` share a host.
    fn open_duplex(
        &self,
        config: &DuplexConfig,
        callback: DuplexCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;
}

/// Resolve a user query to a device handle.
///
/// Accepted forms, tried in order: `host:index`, a bare index into the
/// filtered list (inputs when `want_input`, outputs otherwise), then a
/// case-insensitive substring of the device name.
pub fn resolve_device(devices: &[DeviceInfo], query: &str, want_input: bool) -> Result<DeviceHandle> {
    let candidates: Vec<&DeviceInfo> = devices
        .iter()
        .filter(|d| if want_input { d.is_input } else { d.is_output })
        .collect();
    let direction = if want_input { "input" } else { "output" };

    if let Some((host, index)) = query.rsplit_once(':')
        && let Ok(index) = index.trim().parse::<usize>()
    {
        return candidates
            .iter()
            .find(|d| d.handle.host.eq_ignore_ascii_case(host.trim()) && d.handle.index == index)
            .map(|d| d.handle.clone())
            .ok_or_else(|| Error::DeviceNotFound(format!("no {direction} device {query}")));
    }

    if let Ok(position) = query.trim().parse::<usize>() {
        return candidates
            .get(position)
            .map(|d| d.handle.clone())
            .ok_or_else(|| {
                Error::DeviceNotFound(format!(
                    "{direction} index {position} out of range (0..{})",
                    candidates.len()
                ))
            });
    }

    let needle = query.to_lowercase();
    candidates
        .iter()
        .find(|d| d.handle.name.to_lowercase().contains(&needle))
        .map(|d| d.handle.clone())
        .ok_or_else(|| Error::DeviceNotFound(format!("no {direction} device matching '{query}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices() -> Vec<DeviceInfo> {
        vec![
            DeviceInfo {
                handle: DeviceHandle::new("ALSA", 0, "HDA Intel PCH"),
                is_input: true,
                is_output: true,
                default_sample_rate: 48000,
            },
            DeviceInfo {
                handle: DeviceHandle::new("ALSA", 1, "USB Audio Interface"),
                is_input: true,
                is_output: false,
                default_sample_rate: 48000,
            },
            DeviceInfo {
                handle: DeviceHandle::new("JACK", 0, "system"),
                is_input: true,
                is_output: true,
                default_sample_rate: 48000,
            },
        ]
    }

    #[test]
    fn resolve_by_host_and_index() {
        let handle = resolve_device(&devices(), "jack:0", true).unwrap();
        assert_eq!(handle.host, "JACK");
        assert_eq!(handle.name, "system");
    }

    #[test]
    fn resolve_by_position_in_filtered_list() {
        // Outputs are [ALSA:0, JACK:0], so position 1 is the JACK device
        let handle = resolve_device(&devices(), "1", false).unwrap();
        assert_eq!(handle, DeviceHandle::new("JACK", 0, "system"));
    }

    #[test]
    fn resolve_by_name_fragment() {
        let handle = resolve_device(&devices(), "usb", true).unwrap();
        assert_eq!(handle.index, 1);
        assert!(resolve_device(&devices(), "usb", false).is_err());
    }

    #[test]
    fn unknown_device_is_not_found() {
        assert!(matches!(
            resolve_device(&devices(), "ALSA:7", true),
            Err(Error::DeviceNotFound(_))
        ));
        assert!(matches!(
            resolve_device(&devices(), "9", true),
            Err(Error::DeviceNotFound(_))
        ));
    }

    #[test]
    fn compatibility_is_host_equality() {
        let a = DeviceHandle::new("ALSA", 0, "a");
        let b = DeviceHandle::new("ALSA", 3, "b");
        let c = DeviceHandle::new("JACK", 0, "a");
        assert!(a.is_compatible_with(&b));
        assert!(!a.is_compatible_with(&c));
        assert_eq!(a.to_string(), "ALSA:0 a");
    }

    #[test]
    fn stream_handle_debug() {
        let handle = StreamHandle::new(42u32);
        assert!(format!("{handle:?}").contains("StreamHandle"));
    }

    #[test]
    fn stream_handle_reports_attached_counter() {
        assert_eq!(StreamHandle::new(()).dropped_frames(), 0);

        let counter = Arc::new(AtomicUsize::new(0));
        let handle = StreamHandle::new(()).with_dropped_frames(Arc::clone(&counter));
        counter.fetch_add(96, Ordering::SeqCst);
        assert_eq!(handle.dropped_frames(), 96);
        assert_eq!(handle.close(), 96);
    }
}
