//! Shared CLI helpers used across multiple commands.

use clap::ValueEnum;
use micprobe_analysis::{Stimulus, StimulusGenerator, StimulusKind};
use micprobe_config::{SavedDevice, Settings};
use micprobe_io::{DeviceHandle, DeviceInfo, DuplexBackend, StopSignal, read_signal, resolve_device};
use std::io::BufRead;
use std::path::Path;

/// Stimulus kinds selectable on the command line.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum CliStimulus {
    #[default]
    Sweep,
    White,
    Pink,
    Silence,
}

impl From<CliStimulus> for StimulusKind {
    fn from(kind: CliStimulus) -> Self {
        match kind {
            CliStimulus::Sweep => StimulusKind::Sweep,
            CliStimulus::White => StimulusKind::WhiteNoise,
            CliStimulus::Pink => StimulusKind::PinkNoise,
            CliStimulus::Silence => StimulusKind::Silence,
        }
    }
}

/// Load settings, falling back to defaults when the file does not exist.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let settings = Settings::load_or_default(path)?;
    tracing::debug!(path = %path.display(), "settings loaded");
    Ok(settings)
}

/// The sweep described by the stimulus settings, or the one stored in `file`.
///
/// A stored sweep must match the measurement sample rate.
pub fn load_sweep(settings: &Settings, file: Option<&Path>) -> anyhow::Result<Stimulus> {
    let s = &settings.stimulus;
    let Some(file) = file else {
        let mut generator = StimulusGenerator::new(settings.measurement.sample_rate);
        if let Some(seed) = s.seed {
            generator = generator.with_seed(seed);
        }
        return Ok(generator.sweep(s.duration_secs, s.f_start, s.f_end)?);
    };

    let signal = read_signal(file)?;
    signal.ensure_sample_rate(settings.measurement.sample_rate)?;
    Ok(Stimulus::from_signal(
        StimulusKind::Sweep,
        signal,
        Some((s.f_start, s.f_end)),
    )?)
}

/// Resolve the input/output pair from explicit queries, the saved selection,
/// or the backend defaults, in that order.
pub fn select_devices(
    backend: &dyn DuplexBackend,
    settings: &Settings,
    input: Option<&str>,
    output: Option<&str>,
) -> anyhow::Result<(DeviceHandle, DeviceHandle)> {
    let devices = backend.list_devices()?;
    let (default_input, default_output) = backend.default_devices()?;

    let input = pick(&devices, input, settings.devices.input.as_ref(), default_input, true)?;
    let output = pick(&devices, output, settings.devices.output.as_ref(), default_output, false)?;
    Ok((input, output))
}

fn pick(
    devices: &[DeviceInfo],
    query: Option<&str>,
    saved: Option<&SavedDevice>,
    default: Option<DeviceHandle>,
    want_input: bool,
) -> anyhow::Result<DeviceHandle> {
    if let Some(query) = query {
        return Ok(resolve_device(devices, query, want_input)?);
    }
    if let Some(saved) = saved {
        let query = format!("{}:{}", saved.host, saved.index);
        return Ok(resolve_device(devices, &query, want_input)?);
    }
    let direction = if want_input { "input" } else { "output" };
    default.ok_or_else(|| anyhow::anyhow!("no default {direction} device; pass --{direction}"))
}

/// Settings entry for a resolved device.
pub fn saved_device(handle: &DeviceHandle) -> SavedDevice {
    SavedDevice {
        host: handle.host.clone(),
        index: handle.index,
        name: handle.name.clone(),
    }
}

/// Wire Ctrl+C and a `q` line on stdin to `stop`.
pub fn install_stop_handler(stop: &StopSignal) -> anyhow::Result<()> {
    let on_signal = stop.clone();
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        on_signal.stop();
    })?;

    let on_quit = stop.clone();
    std::thread::Builder::new()
        .name("micprobe-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().eq_ignore_ascii_case("q") {
                    println!("Stopping...");
                    on_quit.stop();
                    break;
                }
            }
        })?;
    Ok(())
}
