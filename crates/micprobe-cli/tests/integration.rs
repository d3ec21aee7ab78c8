//! Integration tests for micprobe-cli.
//!
//! Tests drive the `micprobe` binary end to end with an isolated settings
//! file and measurement root in a temporary directory. Nothing here touches
//! audio hardware.

use micprobe_config::Settings;
use micprobe_io::{WavFormat, read_wav_info};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to get the path to the `micprobe` binary built by cargo.
fn micprobe_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_micprobe"))
}

/// Small, fast measurement settings written to `<dir>/config.toml`.
fn write_fast_config(dir: &Path) -> PathBuf {
    let mut settings = Settings::default();
    settings.measurement.sample_rate = 8000;
    settings.stimulus.duration_secs = 0.5;
    settings.stimulus.f_start = 50.0;
    settings.stimulus.f_end = 3500.0;
    let path = dir.join("config.toml");
    settings.save(&path).unwrap();
    path
}

fn run(cmd: &mut Command) -> Output {
    let output = cmd.output().expect("failed to run micprobe");
    if !output.status.success() {
        eprintln!("stderr: {}", String::from_utf8_lossy(&output.stderr));
    }
    output
}

/// Generate the configured sweep and install it as `count` takes of `mic`.
fn seed_takes(root: &Path, config: &Path, mic: &str, count: usize) {
    let sweep = root.join("sweep.wav");
    let out = run(micprobe_bin()
        .args(["generate", "sweep"])
        .arg(&sweep)
        .arg("--config")
        .arg(config));
    assert!(out.status.success());

    let dir = root.join("recordings").join(mic);
    std::fs::create_dir_all(&dir).unwrap();
    for n in 1..=count {
        std::fs::copy(&sweep, dir.join(format!("mic_take_{n}.wav"))).unwrap();
    }
}

fn single_output_dir(root: &Path) -> PathBuf {
    let entries: Vec<PathBuf> = std::fs::read_dir(root.join("output"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1, "expected one output folder");
    entries.into_iter().next().unwrap()
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

#[test]
fn generate_all_writes_three_float_wavs() {
    let dir = TempDir::new().unwrap();
    let signals = dir.path().join("test_signals");

    let out = run(micprobe_bin()
        .args(["generate", "all"])
        .arg(&signals)
        .args(["--duration", "0.25", "--sample-rate", "8000", "--f-end", "3500"])
        .arg("--config")
        .arg(dir.path().join("missing.toml")));
    assert!(out.status.success());

    for name in ["sweep.wav", "white_noise.wav", "pink_noise.wav"] {
        let info = read_wav_info(signals.join(name)).unwrap();
        assert_eq!(info.channels, 1, "{name}");
        assert_eq!(info.sample_rate, 8000, "{name}");
        assert_eq!(info.bits_per_sample, 32, "{name}");
        assert_eq!(info.format, WavFormat::IeeeFloat, "{name}");
        assert_eq!(info.num_frames, 2000, "{name}");
    }
    assert!(!signals.join("silence.wav").exists());
}

#[test]
fn generate_rejects_inverted_sweep() {
    let dir = TempDir::new().unwrap();
    let out = run(micprobe_bin()
        .args(["generate", "sweep"])
        .arg(dir.path().join("sweep.wav"))
        .args(["--f-start", "5000", "--f-end", "100"])
        .arg("--config")
        .arg(dir.path().join("missing.toml")));

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("must be below end frequency"), "{stderr}");
    assert!(!dir.path().join("sweep.wav").exists());
}

// ---------------------------------------------------------------------------
// process
// ---------------------------------------------------------------------------

#[test]
fn process_writes_response_and_metadata() {
    let dir = TempDir::new().unwrap();
    let config = write_fast_config(dir.path());
    seed_takes(dir.path(), &config, "testmic", 3);

    let out = run(micprobe_bin()
        .args(["process", "testmic", "--root"])
        .arg(dir.path())
        .arg("--config")
        .arg(&config));
    assert!(out.status.success());

    let folder = single_output_dir(dir.path());
    let folder_name = folder.file_name().unwrap().to_string_lossy().to_string();
    assert!(folder_name.starts_with("testmic_"), "{folder_name}");

    let response = std::fs::read_to_string(folder.join("response.csv")).unwrap();
    let mut lines = response.lines();
    assert_eq!(
        lines.next(),
        Some("Frequency (Hz);Smoothed Response (dB);Std Dev (dB)")
    );
    let first = lines.next().unwrap();
    assert_eq!(first.split(';').count(), 3);
    assert!(first.ends_with(";0.00"), "identical takes have no spread: {first}");
    assert!(!folder.join("normalized.csv").exists());

    let metadata: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(folder.join("metadata.json")).unwrap())
            .unwrap();
    assert_eq!(metadata["mic_name"], "testmic");
    assert_eq!(metadata["sample_rate"], 8000);
    assert_eq!(metadata["num_takes"], 3);
    assert!(metadata["reference_mic"].is_null());
    assert_eq!(metadata["anomalies"], serde_json::json!([]));
}

#[test]
fn process_against_identical_reference_is_flat() {
    let dir = TempDir::new().unwrap();
    let config = write_fast_config(dir.path());
    seed_takes(dir.path(), &config, "testmic", 3);
    seed_takes(dir.path(), &config, "ref_studio", 2);

    let out = run(micprobe_bin()
        .args(["process", "testmic", "--reference", "studio", "--root"])
        .arg(dir.path())
        .arg("--config")
        .arg(&config));
    assert!(out.status.success());

    let folder = single_output_dir(dir.path());
    let normalized = std::fs::read_to_string(folder.join("normalized.csv")).unwrap();
    let mut lines = normalized.lines();
    assert_eq!(
        lines.next(),
        Some("Frequency (Hz);Normalized Response (dB)")
    );
    let rows: Vec<&str> = lines.collect();
    assert!(!rows.is_empty());
    assert!(rows.iter().all(|row| row.ends_with(";0.00")));

    let metadata: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(folder.join("metadata.json")).unwrap())
            .unwrap();
    assert_eq!(metadata["reference_mic"], "studio");
}

#[test]
fn process_without_takes_fails_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = write_fast_config(dir.path());

    let out = run(micprobe_bin()
        .args(["process", "nomic", "--root"])
        .arg(dir.path())
        .arg("--config")
        .arg(&config));

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("no take files"), "{stderr}");
    assert!(!dir.path().join("output").exists());
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_set_persists_and_show_reflects_it() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("nested").join("config.toml");

    let out = run(micprobe_bin()
        .args(["config", "set", "measurement.take_count", "5", "--config"])
        .arg(&config));
    assert!(out.status.success());
    assert!(config.exists());

    let out = run(micprobe_bin().args(["config", "show", "--config"]).arg(&config));
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("take_count = 5"), "{stdout}");

    let saved = Settings::load(&config).unwrap();
    assert_eq!(saved.measurement.take_count, 5);
}

#[test]
fn config_set_rejects_unknown_and_invalid_values() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");

    let out = run(micprobe_bin()
        .args(["config", "set", "measurement.colour", "blue", "--config"])
        .arg(&config));
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown setting"));

    let out = run(micprobe_bin()
        .args(["config", "set", "measurement.smoothing_bins", "4", "--config"])
        .arg(&config));
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("smoothing_bins"));
    assert!(!config.exists());
}

#[test]
fn config_path_prints_override() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");

    let out = run(micprobe_bin().args(["config", "path", "--config"]).arg(&config));
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        config.display().to_string()
    );
}
