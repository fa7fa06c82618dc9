//! Integration tests for startle-analysis.
//!
//! Exercises the spectral estimator, band filters, and scoring pipeline with
//! synthetic signals whose properties are known in advance.

use std::f64::consts::PI;

use startle_analysis::{
    AnalysisSettings, BandFilter, OfflineAnalysis, StopbandRule, TrialResponseAnalyzer, TrialTrace,
    TrialVerdict, band_filter, power_spectrum, rms,
};
use startle_core::DspError;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sine(freq_hz: f64, sample_rate: f64, num_samples: usize, amplitude: f64) -> Vec<f64> {
    (0..num_samples)
        .map(|i| amplitude * (2.0 * PI * freq_hz * i as f64 / sample_rate).sin())
        .collect()
}

/// Deterministic pseudo-noise in [-1, 1).
fn noise(num_samples: usize, seed: u32) -> Vec<f64> {
    let mut state = seed.max(1);
    (0..num_samples)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            f64::from(state as i32) / f64::from(i32::MAX)
        })
        .collect()
}

// ===========================================================================
// Spectral estimator
// ===========================================================================

#[test]
fn tone_peak_within_one_bin() {
    for (freq, sr, n) in [(1000.0, 44100.0, 4410), (4000.0, 100_000.0, 10_000), (123.0, 24414.0625, 3000)] {
        let spec = power_spectrum(&sine(freq, sr, n, 1.0), sr).unwrap();
        let peak = spec.peak_frequency().unwrap();
        assert!(
            (peak - freq).abs() <= spec.bin_width(),
            "{freq} Hz at {sr}: peak {peak}, bin {}",
            spec.bin_width()
        );
    }
}

#[test]
fn parseval_for_power_of_two_input() {
    // No padding: summed one-sided power equals mean square
    let x = noise(4096, 7);
    let spec = power_spectrum(&x, 1000.0).unwrap();
    let total: f64 = spec.power.iter().sum();
    let mean_sq = x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64;
    assert!((total - mean_sq).abs() / mean_sq < 1e-6, "{total} vs {mean_sq}");
}

#[test]
fn single_sample_spectrum() {
    let spec = power_spectrum(&[2.0], 10.0).unwrap();
    assert_eq!(spec.fft_size, 2);
    assert_eq!(spec.power.len(), 2);
    assert_eq!(spec.frequencies, vec![0.0, 5.0]);
}

#[test]
fn empty_spectrum_fails() {
    assert_eq!(power_spectrum(&[], 1.0).unwrap_err(), DspError::EmptySignal);
}

// ===========================================================================
// Band filter
// ===========================================================================

#[test]
fn response_filter_shapes_noise() {
    let sr = 24414.0625;
    let x = noise(1 << 15, 3);
    let y = band_filter(&x, 50.0, 1000.0, sr).unwrap();
    let spec = power_spectrum(&y[4096..], sr).unwrap();

    let band_power = |lo: f64, hi: f64| -> f64 {
        spec.frequencies
            .iter()
            .zip(&spec.power)
            .filter(|(f, _)| (lo..hi).contains(*f))
            .map(|(_, p)| p)
            .sum::<f64>()
    };
    let inside = band_power(100.0, 900.0);
    let outside = band_power(3000.0, 12000.0);
    assert!(inside > 1e4 * outside, "inside {inside}, outside {outside}");
}

#[test]
fn startle_noise_filter_at_high_rate() {
    // Startle band 1-32 kHz on the 100 kHz output path, narrow rule
    let filter = BandFilter::design(1000.0, 32000.0, 100_000.0, StopbandRule::Narrow).unwrap();
    let sos = filter.sos();
    let db = |f: f64| 20.0 * sos.magnitude_at(f, 100_000.0).log10();
    assert!(db(8000.0) > -1.05);
    assert!(db(500.0) < -59.0);
    assert!(db(45_000.0) < -59.0);
}

#[test]
fn filter_rejects_edges_beyond_nyquist() {
    let err = band_filter(&[0.0; 8], 4000.0, 16000.0, 24414.0625).unwrap_err();
    assert!(matches!(err, DspError::InvalidFilterSpec(_)), "{err}");
}

// ===========================================================================
// Scoring
// ===========================================================================

#[test]
fn online_scoring_separates_populations() {
    let mut analyzer = TrialResponseAnalyzer::new();
    analyzer.score(0, &[], false).unwrap();
    let mut last = None;
    for trial in 1..=20 {
        let is_gap = trial % 2 == 0;
        let amp = if is_gap { 0.3 } else { 1.0 } + 0.01 * trial as f64;
        last = Some(analyzer.score(trial, &sine(200.0, 10000.0, 1000, amp), is_gap).unwrap());
    }
    let result = last.unwrap();
    assert!(result.dprime > 5.0, "dprime {}", result.dprime);
    assert!(result.ratio > 0.2 && result.ratio < 0.5, "ratio {}", result.ratio);
}

#[test]
fn offline_analysis_end_to_end() {
    let sr = 10000.0;
    let traces: Vec<TrialTrace> = (0..12)
        .map(|i| {
            let is_gap = i % 2 == 1;
            let amp = if is_gap { 0.4 } else { 1.0 };
            let mut response = noise(4000, 100 + i as u32)
                .into_iter()
                .map(|v| 0.01 * v)
                .collect::<Vec<_>>();
            // Startle at 150 ms, damped 120 Hz oscillation
            for (k, sample) in response[1500..2500].iter_mut().enumerate() {
                let t = k as f64 / sr;
                *sample += amp * (-t / 0.03).exp() * (2.0 * PI * 120.0 * t).sin();
            }
            TrialTrace {
                response,
                sample_rate: sr,
                is_gap,
                onset_ms: 150.0,
            }
        })
        .collect();

    let settings = AnalysisSettings {
        habituation: 2,
        ..AnalysisSettings::default()
    };
    let report = OfflineAnalysis::new(settings).run(&traces).unwrap();

    assert_eq!(report.count(TrialVerdict::Habituation), 2);
    assert_eq!(report.count(TrialVerdict::Accepted), 10);
    assert!(report.discriminability.dprime > 0.0);
    let gap_rms = rms(&report.gap_average);
    let no_gap_rms = rms(&report.no_gap_average);
    assert!(gap_rms < no_gap_rms);
    assert_eq!(report.gap_plot().len(), 1000);
}
