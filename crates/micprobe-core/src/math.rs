//! Decibel conversions.

/// Smallest linear magnitude converted to dB; anything below is clamped here.
pub const DB_FLOOR: f32 = 1e-12;

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use micprobe_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Convert linear magnitude to decibels, flooring at [`DB_FLOOR`].
///
/// # Example
/// ```rust
/// use micprobe_core::linear_to_db;
///
/// assert!((linear_to_db(1.0) - 0.0).abs() < 0.001);
/// assert!((linear_to_db(0.0) - (-240.0)).abs() < 0.01);
/// ```
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    20.0 * linear.max(DB_FLOOR).log10()
}
