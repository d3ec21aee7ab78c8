//! CSV export and import of frequency-response curves.
//!
//! Files are `;`-delimited with a single header row and values written to
//! two decimal places:
//!
//! ```text
//! Frequency (Hz);Smoothed Response (dB);Std Dev (dB)
//! 0.00;-12.31;0.42
//! 1.00;-12.29;0.40
//! ```
//!
//! [`read_curve_csv`] accepts any file in this layout and uses the first two
//! columns, so a saved response can be reused as a normalization reference.

use crate::curve::FrequencyCurve;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Column delimiter.
pub const DELIMITER: char = ';';

/// Header of a plain response export.
pub const RESPONSE_HEADER: &str = "Frequency (Hz);Response (dB)";

/// Header of a smoothed response export with its spread.
pub const SMOOTHED_HEADER: &str = "Frequency (Hz);Smoothed Response (dB);Std Dev (dB)";

/// Header of a reference-normalized export.
pub const NORMALIZED_HEADER: &str = "Frequency (Hz);Normalized Response (dB)";

/// Write a curve with an arbitrary header (`Frequency (Hz);<label>`).
pub fn write_curve_csv(
    curve: &FrequencyCurve,
    header: &str,
    path: impl AsRef<Path>,
) -> std::io::Result<()> {
    let mut out = BufWriter::new(std::fs::File::create(path)?);
    writeln!(out, "{header}")?;
    for (freq, db) in curve.iter() {
        writeln!(out, "{freq:.2}{DELIMITER}{db:.2}")?;
    }
    out.flush()
}

/// Write a smoothed response next to its per-bin standard deviation.
///
/// Both curves must have the same number of bins.
pub fn write_response_with_std_csv(
    response: &FrequencyCurve,
    std_dev: &FrequencyCurve,
    path: impl AsRef<Path>,
) -> std::io::Result<()> {
    if response.ensure_same_shape(std_dev).is_err() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "response has {} bins but std dev has {}",
                response.len(),
                std_dev.len()
            ),
        ));
    }

    let mut out = BufWriter::new(std::fs::File::create(path)?);
    writeln!(out, "{SMOOTHED_HEADER}")?;
    for ((freq, db), std) in response.iter().zip(std_dev.magnitude_db()) {
        writeln!(out, "{freq:.2}{DELIMITER}{db:.2}{DELIMITER}{std:.2}")?;
    }
    out.flush()
}

/// Read a `;`-delimited curve, taking frequency and magnitude from the first
/// two columns. The header row and blank lines are skipped.
pub fn read_curve_csv(path: impl AsRef<Path>) -> std::io::Result<FrequencyCurve> {
    let reader = BufReader::new(std::fs::File::open(path)?);

    let mut frequencies = Vec::new();
    let mut magnitudes = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with("Frequency") {
            continue;
        }

        let mut fields = line.split(DELIMITER);
        let parsed = match (fields.next(), fields.next()) {
            (Some(f), Some(m)) => f.trim().parse::<f32>().ok().zip(m.trim().parse::<f32>().ok()),
            _ => None,
        };
        let Some((freq, db)) = parsed else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("malformed curve row {}: '{}'", line_no + 1, line),
            ));
        };
        frequencies.push(freq);
        magnitudes.push(db);
    }

    FrequencyCurve::new(frequencies, magnitudes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
}
