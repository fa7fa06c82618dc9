//! Level and time conversions.
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Convert between dB and linear voltage ratio
//! - [`ms_to_samples`] / [`samples_to_ms`] - Time conversions, truncating like the
//!   envelope and pulse-train index arithmetic does

/// Convert decibels to a linear voltage ratio (`10^(dB/20)`).
///
/// # Example
/// ```rust
/// use startle_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 1e-12);
/// assert!((db_to_linear(20.0) - 10.0).abs() < 1e-12);
/// ```
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Convert a linear voltage ratio to decibels (`20·log10(x)`).
///
/// Values at or below 1e-12 are floored so silence maps to a finite level.
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    20.0 * linear.max(1e-12).log10()
}

/// Convert milliseconds to a sample count, truncating toward zero.
///
/// Negative durations yield zero samples.
#[inline]
pub fn ms_to_samples(ms: f64, sample_rate: f64) -> usize {
    let n = (ms / 1000.0 * sample_rate).floor();
    if n > 0.0 { n as usize } else { 0 }
}

/// Convert a sample count to milliseconds.
#[inline]
pub fn samples_to_ms(samples: usize, sample_rate: f64) -> f64 {
    samples as f64 * 1000.0 / sample_rate
}
