//! One-sided power spectrum.
//!
//! The estimator zero-pads to a power of two, keeps the non-negative
//! frequency bins, and folds the negative-frequency energy back in by
//! doubling every bin except DC (and Nyquist, for an even transform).

use crate::fft::Fft;
use startle_core::{DspError, Result};

/// Power per frequency bin.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrum {
    /// Power in each retained bin.
    pub power: Vec<f64>,
    /// Centre frequency (Hz) of each bin.
    pub frequencies: Vec<f64>,
    /// Transform length after padding.
    pub fft_size: usize,
}

impl PowerSpectrum {
    /// Spacing between bins in Hz.
    pub fn bin_width(&self) -> f64 {
        if self.frequencies.len() > 1 {
            self.frequencies[1] - self.frequencies[0]
        } else {
            0.0
        }
    }

    /// Frequency of the strongest bin, ignoring DC.
    pub fn peak_frequency(&self) -> Option<f64> {
        self.power
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| self.frequencies[i])
    }

    /// Local maxima as `(frequency, power)` pairs, strongest first.
    pub fn peaks(&self, max_peaks: usize) -> Vec<(f64, f64)> {
        let mut peaks: Vec<(f64, f64)> = self
            .power
            .windows(3)
            .enumerate()
            .filter(|(_, w)| w[1] > w[0] && w[1] > w[2])
            .map(|(i, w)| (self.frequencies[i + 1], w[1]))
            .collect();
        peaks.sort_by(|a, b| b.1.total_cmp(&a.1));
        peaks.truncate(max_peaks);
        peaks
    }

    /// Power in dB (10·log10), for display.
    pub fn power_db(&self) -> Vec<f64> {
        self.power.iter().map(|p| 10.0 * p.max(1e-30).log10()).collect()
    }
}

/// Padded transform length for `n` input samples.
///
/// Decomposes `n = m·2^e` with `m` in `[0.5, 1)`. A mantissa of exactly 0.5
/// (a power of two) takes exponent 1, so power-of-two inputs are left
/// unpadded, except a single sample which pads to two.
pub fn padded_len(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let (mantissa, exponent) = frexp(n as f64);
    let exponent = if mantissa <= 0.5 { 1 } else { exponent };
    let target = 1usize << exponent;
    n + target.saturating_sub(n)
}

fn frexp(x: f64) -> (f64, i32) {
    // x is a positive integer here, so log2 is exact at powers of two
    let mut e = x.log2().floor() as i32 + 1;
    let mut m = x / 2f64.powi(e);
    // Guard against log2 rounding either way.
    if m >= 1.0 {
        m /= 2.0;
        e += 1;
    } else if m < 0.5 {
        m *= 2.0;
        e -= 1;
    }
    (m, e)
}

/// Compute the one-sided power spectrum of `signal`.
///
/// # Errors
///
/// [`DspError::EmptySignal`] if `signal` is empty.
///
/// # Example
///
/// ```rust
/// use startle_analysis::power_spectrum;
///
/// let sr = 8000.0;
/// let tone: Vec<f64> = (0..1000)
///     .map(|i| (2.0 * std::f64::consts::PI * 1000.0 * i as f64 / sr).sin())
///     .collect();
/// let spec = power_spectrum(&tone, sr).unwrap();
/// assert_eq!(spec.fft_size, 1024);
/// let peak = spec.peak_frequency().unwrap();
/// assert!((peak - 1000.0).abs() <= spec.bin_width());
/// ```
pub fn power_spectrum(signal: &[f64], sample_rate: f64) -> Result<PowerSpectrum> {
    if signal.is_empty() {
        return Err(DspError::EmptySignal);
    }

    let n = padded_len(signal.len());
    let fft = Fft::new(n);
    let spectrum = fft.forward(signal);

    let n_unique = (n + 2) / 2; // ceil((n + 1) / 2)
    let scale = n as f64;
    let mut power: Vec<f64> = spectrum[..n_unique]
        .iter()
        .map(|c| (c.norm() / scale).powi(2))
        .collect();

    let max = power.iter().copied().fold(0.0_f64, f64::max);
    for p in &mut power {
        *p += 1e-12 * max;
    }

    let last = if n % 2 > 0 { power.len() } else { power.len() - 1 };
    for p in power.iter_mut().take(last).skip(1) {
        *p *= 2.0;
    }

    let frequencies = (0..n_unique)
        .map(|i| i as f64 * sample_rate / n as f64)
        .collect();

    tracing::debug!(input = signal.len(), fft_size = n, "power spectrum");

    Ok(PowerSpectrum {
        power,
        frequencies,
        fft_size: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn padding_rule() {
        assert_eq!(padded_len(1), 2);
        assert_eq!(padded_len(2), 2);
        assert_eq!(padded_len(3), 4);
        assert_eq!(padded_len(5), 8);
        assert_eq!(padded_len(8), 8);
        assert_eq!(padded_len(1000), 1024);
        assert_eq!(padded_len(1024), 1024);
        assert_eq!(padded_len(1025), 2048);
    }

    #[test]
    fn frexp_matches_definition() {
        assert_eq!(frexp(1.0), (0.5, 1));
        assert_eq!(frexp(8.0), (0.5, 4));
        assert_eq!(frexp(5.0), (0.625, 3));
    }

    #[test]
    fn empty_signal_is_rejected() {
        assert_eq!(power_spectrum(&[], 1000.0), Err(DspError::EmptySignal));
    }

    #[test]
    fn bin_count_and_axis() {
        let spec = power_spectrum(&[0.0; 100], 1000.0).unwrap();
        assert_eq!(spec.fft_size, 128);
        assert_eq!(spec.power.len(), 65);
        assert_eq!(spec.frequencies.len(), 65);
        assert_eq!(spec.frequencies[0], 0.0);
        assert!((spec.frequencies[64] - 500.0).abs() < 1e-9);
    }

    #[test]
    fn dc_and_nyquist_are_not_doubled() {
        // Constant signal: all power in DC. Alternating signal: all at Nyquist.
        let dc = power_spectrum(&[1.0; 8], 8.0).unwrap();
        assert!((dc.power[0] - 1.0).abs() < 1e-9);

        let alt: Vec<f64> = (0..8).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let ny = power_spectrum(&alt, 8.0).unwrap();
        assert!((ny.power[4] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn interior_bins_are_doubled() {
        // cos at bin 2 of 16: |X| = 8, (8/16)^2 = 0.25, doubled = 0.5
        let x: Vec<f64> = (0..16).map(|i| (2.0 * PI * 2.0 * i as f64 / 16.0).cos()).collect();
        let spec = power_spectrum(&x, 16.0).unwrap();
        assert!((spec.power[2] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn floor_keeps_power_positive() {
        let mut x = vec![0.0; 32];
        x[0] = 1.0;
        let spec = power_spectrum(&x, 32.0).unwrap();
        assert!(spec.power.iter().all(|&p| p > 0.0));
    }

    #[test]
    fn peaks_sorted_by_power() {
        let sr = 8000.0;
        let x: Vec<f64> = (0..2048)
            .map(|i| {
                let t = i as f64 / sr;
                (2.0 * PI * 500.0 * t).sin() + 0.3 * (2.0 * PI * 2000.0 * t).sin()
            })
            .collect();
        let spec = power_spectrum(&x, sr).unwrap();
        let peaks = spec.peaks(2);
        assert_eq!(peaks.len(), 2);
        assert!((peaks[0].0 - 500.0).abs() <= spec.bin_width());
        assert!((peaks[1].0 - 2000.0).abs() <= spec.bin_width());
    }
}
