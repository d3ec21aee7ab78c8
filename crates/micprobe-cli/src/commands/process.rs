//! Offline processing of recorded take sets into response curves.

use super::common::{load_settings, load_sweep};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use micprobe_analysis::FrequencyCurve;
use micprobe_analysis::export::{
    NORMALIZED_HEADER, read_curve_csv, write_curve_csv, write_response_with_std_csv,
};
use micprobe_config::paths;
use micprobe_session::{AnalysisOptions, analyze_takes, load_take_dir};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct ProcessArgs {
    /// Microphone name; takes are read from recordings/<NAME>
    name: String,

    /// Reference microphone whose take set (recordings/ref_<NAME>) is
    /// processed and used for normalization
    #[arg(long, value_name = "NAME", conflicts_with = "reference_csv")]
    reference: Option<String>,

    /// Saved response CSV to normalize against
    #[arg(long, value_name = "FILE")]
    reference_csv: Option<PathBuf>,

    /// Sweep WAV the takes were recorded with [default: generated from settings]
    #[arg(long, value_name = "FILE")]
    stimulus: Option<PathBuf>,

    /// Directory holding recordings/ and output/
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

/// Contents of `metadata.json`.
#[derive(Serialize)]
struct Metadata<'a> {
    mic_name: &'a str,
    timestamp: &'a str,
    reference_mic: Option<&'a str>,
    reference_csv: Option<String>,
    output_folder: String,
    stimulus_file: Option<String>,
    sample_rate: u32,
    num_takes: usize,
    anomaly_threshold_db: f32,
    anomalies: Vec<usize>,
}

pub fn run(args: ProcessArgs, config_path: &Path) -> anyhow::Result<()> {
    let settings = load_settings(config_path)?;
    let options = AnalysisOptions::from(&settings);
    let stimulus = load_sweep(&settings, args.stimulus.as_deref())?;

    let take_dir = paths::take_dir(&args.root, &args.name, false);
    let takes = load_take_dir(&take_dir)?;

    let reference = match (&args.reference, &args.reference_csv) {
        (Some(name), _) => {
            let dir = paths::take_dir(&args.root, name, true);
            let ref_takes = load_take_dir(&dir)?;
            let set = analyze_takes(&ref_takes, &stimulus, &options, None)?;
            println!("Reference {name}: {} take(s) from {}", ref_takes.len(), dir.display());
            Some(set.smoothed)
        }
        (None, Some(csv)) => Some(read_curve_csv(csv).map_err(|e| {
            anyhow::anyhow!("failed to read reference curve {}: {e}", csv.display())
        })?),
        (None, None) => None,
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    pb.set_message(format!("Analysing {} take(s)...", takes.len()));
    let set = analyze_takes(&takes, &stimulus, &options, reference.as_ref());
    pb.finish_and_clear();
    let set = set?;

    let anomalies = set.anomalies();
    if !anomalies.is_empty() {
        println!(
            "Warning: takes {anomalies:?} deviate more than {} dB from the mean",
            options.threshold_db
        );
    }

    let timestamp = jiff::Zoned::now().strftime("%Y%m%d_%H%M%S").to_string();
    let out = paths::output_dir(&args.root, &args.name, &timestamp);
    std::fs::create_dir_all(&out)?;

    let response_path = out.join("response.csv");
    write_response_with_std_csv(&set.smoothed, &set.aggregate.std_dev, &response_path)?;
    println!("Saved response CSV to {}", response_path.display());

    if let Some(normalized) = &set.normalized {
        let normalized_path = out.join("normalized.csv");
        write_curve_csv(normalized, NORMALIZED_HEADER, &normalized_path)?;
        println!("Saved normalized CSV to {}", normalized_path.display());
        print_summary("normalized", normalized);
    } else {
        print_summary("response", &set.smoothed);
    }

    let metadata = Metadata {
        mic_name: &args.name,
        timestamp: &timestamp,
        reference_mic: args.reference.as_deref(),
        reference_csv: args.reference_csv.as_ref().map(|p| p.display().to_string()),
        output_folder: out.display().to_string(),
        stimulus_file: args.stimulus.as_ref().map(|p| p.display().to_string()),
        sample_rate: stimulus.sample_rate(),
        num_takes: takes.len(),
        anomaly_threshold_db: options.threshold_db,
        anomalies,
    };
    let metadata_path = out.join("metadata.json");
    std::fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)?;
    println!("Saved metadata to {}", metadata_path.display());

    Ok(())
}

fn print_summary(label: &str, curve: &FrequencyCurve) {
    println!("\n{label} at reference frequencies:");
    for hz in [100.0, 1000.0, 10000.0] {
        if curve.frequencies().last().is_some_and(|&max| hz <= max) {
            println!("  {:>7.0} Hz: {:+.2} dB", hz, curve.magnitude_at(hz));
        }
    }
}
