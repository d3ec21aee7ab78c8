//! Take recording commands: full take sets and single noise captures.

use super::common::{
    CliStimulus, install_stop_handler, load_settings, load_sweep, saved_device, select_devices,
};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use micprobe_analysis::StimulusKind;
use micprobe_config::{Settings, paths};
use micprobe_io::{CpalBackend, DeviceHandle, WavSpec, write_signal};
use micprobe_session::{Decision, MeasurementSession, Take};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Device selection shared by the recording commands.
#[derive(Args)]
pub struct DeviceArgs {
    /// Input device (host:index, list position or part of the name)
    #[arg(short, long)]
    input: Option<String>,

    /// Output device (host:index, list position or part of the name)
    #[arg(short, long)]
    output: Option<String>,

    /// Remember the selected devices in the settings file
    #[arg(long)]
    save_devices: bool,
}

impl DeviceArgs {
    fn resolve(
        &self,
        backend: &CpalBackend,
        settings: &mut Settings,
        config_path: &Path,
    ) -> anyhow::Result<(DeviceHandle, DeviceHandle)> {
        let (input, output) = select_devices(
            backend,
            settings,
            self.input.as_deref(),
            self.output.as_deref(),
        )?;
        if self.save_devices {
            settings.devices.input = Some(saved_device(&input));
            settings.devices.output = Some(saved_device(&output));
            settings.save(config_path)?;
            println!("Saved device selection to {}", config_path.display());
        }
        Ok((input, output))
    }
}

#[derive(Args)]
pub struct RecordArgs {
    /// Microphone name; takes are written to recordings/<NAME>
    name: String,

    /// Record a reference microphone (recordings/ref_<NAME>)
    #[arg(long)]
    reference: bool,

    #[command(flatten)]
    devices: DeviceArgs,

    /// Sweep WAV to play instead of generating one from the settings
    #[arg(long, value_name = "FILE")]
    stimulus: Option<PathBuf>,

    /// Number of takes [default: from settings]
    #[arg(long)]
    takes: Option<usize>,

    /// Re-record at most this many times when a take is anomalous
    #[arg(long, default_value = "2")]
    max_retries: usize,

    /// Directory holding recordings/ and output/
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

#[derive(Args)]
pub struct NoiseArgs {
    /// Microphone name; the capture is written to recordings/<NAME>
    name: String,

    /// Stimulus to play
    #[arg(long, value_enum, default_value_t = CliStimulus::Pink)]
    kind: CliStimulus,

    #[command(flatten)]
    devices: DeviceArgs,

    /// Directory holding recordings/ and output/
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

pub fn run(args: RecordArgs, config_path: &Path) -> anyhow::Result<()> {
    let mut settings = load_settings(config_path)?;
    if let Some(takes) = args.takes {
        settings.measurement.take_count = takes;
    }

    let backend = CpalBackend::new();
    let (input, output) = args.devices.resolve(&backend, &mut settings, config_path)?;
    let stimulus = load_sweep(&settings, args.stimulus.as_deref())?;
    let threshold = settings.measurement.anomaly_threshold_db;
    let take_count = settings.measurement.take_count;

    println!("Recording {} ({} takes)", args.name, take_count);
    println!("  Input:  {input}");
    println!("  Output: {output}");
    println!(
        "  Sweep:  {:.1}s @ {} Hz",
        stimulus.params().duration_secs,
        stimulus.sample_rate()
    );
    println!("\nPress Ctrl+C or type q + Enter to stop...\n");

    let mut session = MeasurementSession::new(&backend, input, output, settings)?;
    install_stop_handler(&session.stop_signal())?;
    let dir = paths::take_dir(&args.root, &args.name, args.reference);

    for attempt in 0..=args.max_retries {
        let spinner = spinner(format!("Recording {take_count} take(s)..."))?;
        let outcome = session.measure(&stimulus, None);
        spinner.finish_and_clear();
        let outcome = outcome?;
        report_lost_frames(&outcome.takes);

        match outcome.decision {
            Decision::Cancelled => {
                println!(
                    "Recording stopped; {} take(s) discarded, nothing written.",
                    outcome.takes.len()
                );
                return Ok(());
            }
            Decision::Accepted { anomalies } => {
                save_takes(&dir, &outcome.takes)?;
                if !anomalies.is_empty() {
                    println!(
                        "Warning: takes {anomalies:?} exceed {threshold} dB (accepted by policy)"
                    );
                }
                println!("Saved {} take(s) to {}", outcome.takes.len(), dir.display());
                return Ok(());
            }
            Decision::RetryRequested { anomalies } if attempt == args.max_retries => {
                save_takes(&dir, &outcome.takes)?;
                println!(
                    "Warning: takes {anomalies:?} still exceed {threshold} dB after {} retries",
                    args.max_retries
                );
                println!("Kept the last take set in {}", dir.display());
                return Ok(());
            }
            Decision::RetryRequested { anomalies } => {
                println!(
                    "Takes {anomalies:?} deviate more than {threshold} dB; re-recording ({}/{})",
                    attempt + 1,
                    args.max_retries
                );
            }
        }
    }

    Ok(())
}

pub fn run_noise(args: NoiseArgs, config_path: &Path) -> anyhow::Result<()> {
    let mut settings = load_settings(config_path)?;
    let backend = CpalBackend::new();
    let (input, output) = args.devices.resolve(&backend, &mut settings, config_path)?;
    let kind = StimulusKind::from(args.kind);

    println!("Capturing {kind} through {input} / {output}");
    let mut session = MeasurementSession::new(&backend, input, output, settings)?;
    install_stop_handler(&session.stop_signal())?;

    let spinner = spinner(format!("Playing {kind}..."))?;
    let take = session.capture_noise_sample(kind);
    spinner.finish_and_clear();
    let take = take?;

    if let Some(truncated) = take.truncated {
        println!(
            "Stopped after {} of {} frames; nothing written.",
            truncated.captured_frames, truncated.expected_frames
        );
        return Ok(());
    }
    report_lost_frames(std::slice::from_ref(&take));

    let dir = paths::take_dir(&args.root, &args.name, false);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(format!("noise_{}.wav", kind.file_stem()));
    write_signal(&path, &take.signal, WavSpec::default())?;
    println!(
        "Saved {kind} capture (peak {:.1} dBFS) to {}",
        micprobe_core::linear_to_db(take.signal.peak()),
        path.display()
    );
    Ok(())
}

fn report_lost_frames(takes: &[Take]) {
    for take in takes.iter().filter(|t| t.dropped_frames > 0) {
        println!(
            "Warning: take {} lost {} input frame(s) to a device overrun",
            take.index, take.dropped_frames
        );
    }
}

/// Replace the take files in `dir` with `takes`.
fn save_takes(dir: &Path, takes: &[Take]) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    remove_takes(dir)?;
    for take in takes {
        let path = dir.join(paths::take_file_name(take.index));
        write_signal(&path, &take.signal, WavSpec::default())?;
        tracing::info!(path = %path.display(), "take saved");
    }
    Ok(())
}

fn remove_takes(dir: &Path) -> anyhow::Result<()> {
    for path in paths::list_take_files(dir) {
        std::fs::remove_file(&path)?;
        tracing::debug!(path = %path.display(), "take removed");
    }
    Ok(())
}

fn spinner(message: String) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("[{elapsed_precise}] {spinner} {msg}")?,
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}
