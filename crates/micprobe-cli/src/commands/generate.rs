//! Stimulus file generation command.

use super::common::load_settings;
use clap::Args;
use micprobe_analysis::{Stimulus, StimulusGenerator, StimulusKind};
use micprobe_io::{WavSpec, write_signal};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct GenerateArgs {
    /// Stimulus to generate, or every file stimulus at once
    #[arg(value_enum)]
    kind: GenerateKind,

    /// Output WAV file, or a directory for `all`
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Duration in seconds [default: from settings]
    #[arg(long)]
    duration: Option<f32>,

    /// Sample rate in Hz [default: from settings]
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Sweep start frequency in Hz [default: from settings]
    #[arg(long)]
    f_start: Option<f32>,

    /// Sweep end frequency in Hz [default: from settings]
    #[arg(long)]
    f_end: Option<f32>,

    /// Noise seed [default: from settings]
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum GenerateKind {
    Sweep,
    White,
    Pink,
    Silence,
    /// sweep.wav, white_noise.wav and pink_noise.wav
    All,
}

impl GenerateKind {
    fn stimuli(self) -> &'static [StimulusKind] {
        match self {
            GenerateKind::Sweep => &[StimulusKind::Sweep],
            GenerateKind::White => &[StimulusKind::WhiteNoise],
            GenerateKind::Pink => &[StimulusKind::PinkNoise],
            GenerateKind::Silence => &[StimulusKind::Silence],
            GenerateKind::All => &[
                StimulusKind::Sweep,
                StimulusKind::WhiteNoise,
                StimulusKind::PinkNoise,
            ],
        }
    }
}

pub fn run(args: GenerateArgs, config_path: &Path) -> anyhow::Result<()> {
    let settings = load_settings(config_path)?;
    let s = &settings.stimulus;
    let duration = args.duration.unwrap_or(s.duration_secs);
    let f_start = args.f_start.unwrap_or(s.f_start);
    let f_end = args.f_end.unwrap_or(s.f_end);
    let sample_rate = args.sample_rate.unwrap_or(settings.measurement.sample_rate);

    let mut generator = StimulusGenerator::new(sample_rate);
    if let Some(seed) = args.seed.or(s.seed) {
        generator = generator.with_seed(seed);
    }

    if let GenerateKind::All = args.kind {
        std::fs::create_dir_all(&args.output)?;
    }
    for &kind in args.kind.stimuli() {
        let stimulus = generator.generate(kind, duration, f_start, f_end)?;
        let path = match args.kind {
            GenerateKind::All => args.output.join(format!("{}.wav", kind.file_stem())),
            _ => args.output.clone(),
        };
        write(&stimulus, &path)?;
    }

    Ok(())
}

fn write(stimulus: &Stimulus, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_signal(path, stimulus.signal(), WavSpec::default())?;
    println!(
        "Wrote {} ({} samples, {:.2}s @ {} Hz) to {}",
        stimulus.kind(),
        stimulus.len(),
        stimulus.params().duration_secs,
        stimulus.sample_rate(),
        path.display()
    );
    Ok(())
}
