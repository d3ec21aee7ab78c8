//! Platform-specific paths and the on-disk measurement layout.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/micprobe/config.toml` (Linux),
//!   `~/Library/Application Support/micprobe/config.toml` (macOS),
//!   `%APPDATA%\micprobe\config.toml` (Windows)
//! - **Takes**: `<root>/recordings/<mic>/mic_take_<n>.wav`, or
//!   `<root>/recordings/ref_<mic>/...` for reference microphones
//! - **Results**: `<root>/output/<mic>_<YYYYmmdd_HHMMSS>/`

use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "micprobe";

/// Settings file name inside the config directory.
const CONFIG_FILE: &str = "config.toml";

/// Directory holding recorded take sets.
pub const RECORDINGS_DIR: &str = "recordings";

/// Directory holding processed results.
pub const OUTPUT_DIR: &str = "output";

/// Prefix marking a reference microphone's take directory.
pub const REFERENCE_PREFIX: &str = "ref_";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the user settings file.
pub fn config_file() -> PathBuf {
    user_config_dir().join(CONFIG_FILE)
}

/// Directory for one microphone's takes.
pub fn take_dir(root: &Path, mic: &str, reference: bool) -> PathBuf {
    let name = if reference {
        format!("{REFERENCE_PREFIX}{mic}")
    } else {
        mic.to_string()
    };
    root.join(RECORDINGS_DIR).join(name)
}

/// File name of take `index` (1-based).
pub fn take_file_name(index: usize) -> String {
    format!("mic_take_{index}.wav")
}

/// Take files present in `dir`, ordered by take number.
///
/// Files that do not follow the `mic_take_<n>.wav` pattern are ignored.
pub fn list_take_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut takes: Vec<(usize, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter_map(|path| {
            let index = path
                .file_name()?
                .to_str()?
                .strip_prefix("mic_take_")?
                .strip_suffix(".wav")?
                .parse::<usize>()
                .ok()?;
            Some((index, path))
        })
        .collect();
    takes.sort_by_key(|(index, _)| *index);
    takes.into_iter().map(|(_, path)| path).collect()
}

/// Results directory for a processing run; `stamp` is `YYYYmmdd_HHMMSS`.
pub fn output_dir(root: &Path, mic: &str, stamp: &str) -> PathBuf {
    root.join(OUTPUT_DIR).join(format!("{mic}_{stamp}"))
}
