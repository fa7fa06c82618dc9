//! Integration tests for startle-synth.
//!
//! Stimuli are checked through the spectral estimator, the way a recording
//! would be inspected after the fact.

use rand::SeedableRng;
use rand::rngs::StdRng;
use startle_analysis::{power_spectrum, rms};
use startle_core::{OutputChannel, gain_for_level};
use startle_synth::{
    PlanSettings, StimulusMode, StimulusSpec, Synthesizer, TrialComposer, TrialLayout, TrialPlan,
};

// ============================================================================
// Spectral content
// ============================================================================

#[test]
fn tone_frequency_recovered_from_spectrum() {
    let mut synth = Synthesizer::seeded(0);
    for (freq, sr) in [(1000.0, 44100.0), (4000.0, 100_000.0), (12_345.0, 100_000.0)] {
        let spec = StimulusSpec::tone(&[freq]).with_duration(100.0).with_sample_rate(sr);
        let wave = synth.synthesize(&spec).unwrap();
        let spec = power_spectrum(wave.samples(), sr).unwrap();
        let peak = spec.peak_frequency().unwrap();
        assert!((peak - freq).abs() <= spec.bin_width(), "{freq}: got {peak}");
    }
}

#[test]
fn bandpass_noise_stays_in_band() {
    let sr = 100_000.0;
    let spec = StimulusSpec::bandpass_noise(4000.0, 16000.0)
        .with_duration(500.0)
        .with_sample_rate(sr);
    let wave = Synthesizer::seeded(11).synthesize(&spec).unwrap();
    let ps = power_spectrum(wave.samples(), sr).unwrap();

    let band = |lo: f64, hi: f64| -> f64 {
        ps.frequencies
            .iter()
            .zip(&ps.power)
            .filter(|(f, _)| (lo..hi).contains(*f))
            .map(|(_, p)| p)
            .sum()
    };
    let inside = band(4000.0, 16000.0);
    assert!(inside > 1e3 * band(0.0, 2500.0), "low leakage");
    assert!(inside > 1e3 * band(22000.0, 50000.0), "high leakage");
}

#[test]
fn broadband_noise_rms_tracks_level() {
    let sr = 44100.0;
    let spec = StimulusSpec::broadband_noise()
        .with_duration(1000.0)
        .with_sample_rate(sr)
        .with_level(90.0, OutputChannel::Startle);
    let wave = Synthesizer::seeded(2).synthesize(&spec).unwrap();
    // Plateau rms of unit Gaussian noise times the calibrated gain
    let expected = gain_for_level(90.0, OutputChannel::Startle);
    let got = rms(&wave.samples()[1000..43000]);
    assert!((got / expected - 1.0).abs() < 0.03, "{got} vs {expected}");
}

// ============================================================================
// Trials
// ============================================================================

#[test]
fn plan_drives_composer() {
    let settings = PlanSettings {
        count: 6,
        habituation: 2,
        iti_s: 1.0,
        iti_variation_s: 0.5,
        conditioning_ms: 150.0,
        conditioning_variation_ms: 40.0,
    };
    let plan = TrialPlan::generate(&settings, &mut StdRng::seed_from_u64(8));
    let layout = TrialLayout {
        conditioning_mode: StimulusMode::BroadbandNoise,
        sample_rate: 44100.0,
        startle_band_hz: [1000.0, 16000.0],
        ..TrialLayout::default()
    };
    let mut composer = TrialComposer::new(layout, Synthesizer::seeded(8));

    for trial in plan.trials() {
        let stim = composer.compose(trial.conditioning_ms, trial.is_gap).unwrap();
        assert_eq!(stim.left.len(), stim.right.len());
        assert!((stim.onset_ms - (trial.conditioning_ms + 120.0)).abs() < 1e-9);

        let sr = stim.left.sample_rate();
        let mid_gap = ((trial.conditioning_ms + 10.0) / 1000.0 * sr) as usize;
        let level = rms(&stim.left.samples()[mid_gap - 50..mid_gap + 50]);
        if trial.is_gap {
            assert!(level < 1e-9, "trial {} should be silent, rms {level}", trial.index);
        } else {
            assert!(level > 0.05, "trial {} should be loud, rms {level}", trial.index);
        }
    }
}

#[test]
fn invalid_startle_band_surfaces_error() {
    let layout = TrialLayout {
        sample_rate: 44100.0,
        ..TrialLayout::default()
    };
    // Default startle band tops out at 32 kHz, beyond Nyquist at 44.1 kHz
    let mut composer = TrialComposer::new(layout, Synthesizer::seeded(0));
    assert!(composer.compose(100.0, false).is_err());
}
