//! Cosine-squared rise/fall envelope.
//!
//! Stimuli are tapered at onset and offset to avoid the spectral splatter an
//! abrupt edge would produce. The envelope is zero before the delay, rises as
//! `sin²(π·t / (2·rf))`, holds at 1.0 through the plateau, and decays as the
//! exact mirror image of the rise so the final sample equals the first.

use crate::math::ms_to_samples;
use core::f64::consts::PI;

/// Build a rise/fall gain envelope.
///
/// # Arguments
///
/// * `delay_ms` - Silence before the envelope starts
/// * `duration_ms` - Length of the shaped region (rise + plateau + fall)
/// * `sample_rate` - Sample rate in Hz
/// * `rise_fall_ms` - Length of each of the rise and fall ramps
///
/// # Returns
///
/// `floor((delay + duration) / 1000 · sample_rate)` gains in `[0, 1]`.
///
/// When `2·rise_fall` does not fit in `duration`, the ramps are shortened to
/// half the shaped region so the envelope still peaks in the middle.
///
/// # Example
///
/// ```rust
/// use startle_core::rf_shape;
///
/// let env = rf_shape(10.0, 50.0, 1000.0, 5.0);
/// assert_eq!(env.len(), 60);
/// assert!(env[..10].iter().all(|&g| g == 0.0));
/// assert_eq!(env[30], 1.0);
/// ```
pub fn rf_shape(delay_ms: f64, duration_ms: f64, sample_rate: f64, rise_fall_ms: f64) -> Vec<f64> {
    let len = ms_to_samples(delay_ms + duration_ms, sample_rate);
    let jd = ms_to_samples(delay_ms, sample_rate).min(len);
    let shaped = len - jd;

    let requested = ms_to_samples(rise_fall_ms, sample_rate);
    let (nf, rf_s) = if 2 * requested > shaped {
        tracing::warn!(
            rise_fall_ms,
            duration_ms,
            "rise/fall longer than half the duration, shortening ramps"
        );
        // Stretch the sin² argument so the shortened rise still reaches 1.
        let nf = shaped / 2;
        (nf, nf as f64 / sample_rate)
    } else {
        (requested, rise_fall_ms / 1000.0)
    };

    let mut env = vec![0.0; len];
    env[jd..].fill(1.0);

    for k in 0..nf {
        let t = k as f64 / sample_rate;
        let g = (PI * t / (2.0 * rf_s)).sin().powi(2);
        env[jd + k] = g;
        env[len - 1 - k] = g;
    }

    env
}

/// Number of samples in each ramp of an envelope built by [`rf_shape`].
pub fn ramp_samples(duration_ms: f64, sample_rate: f64, rise_fall_ms: f64) -> usize {
    let shaped = ms_to_samples(duration_ms, sample_rate);
    ms_to_samples(rise_fall_ms, sample_rate).min(shaped / 2)
}
