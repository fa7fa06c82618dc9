//! Property tests for gap insertion and stimulus synthesis.

use proptest::prelude::*;
use startle_core::{Waveform, ms_to_samples};
use startle_synth::{StimulusSpec, Synthesizer, insert_gap};

// ============================================================================
// Gap locality
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn gap_leaves_outside_untouched(
        samples in prop::collection::vec(-1.0f64..1.0, 200..2000),
        delay_ms in 0.0f64..100.0,
        duration_ms in 5.0f64..60.0,
        rise_fall_ms in 0.0f64..2.0,
    ) {
        let sr = 10_000.0;
        let wave = Waveform::new(samples, sr);
        let gapped = insert_gap(&wave, delay_ms, duration_ms, rise_fall_ms);

        let start = ms_to_samples(delay_ms, sr);
        let end = ms_to_samples(delay_ms + duration_ms, sr);
        prop_assert_eq!(gapped.len(), wave.len().max(end));
        for i in (0..start.min(wave.len())).chain(end..wave.len()) {
            prop_assert_eq!(gapped.samples()[i], wave.samples()[i]);
        }
        for i in start..end.min(wave.len()) {
            prop_assert!(gapped.samples()[i].abs() <= wave.samples()[i].abs() + 1e-15);
        }
    }

    #[test]
    fn gap_twice_is_gap_once_outside_window(
        samples in prop::collection::vec(-1.0f64..1.0, 500..1000),
        delay_ms in 0.0f64..20.0,
    ) {
        let wave = Waveform::new(samples, 10_000.0);
        let once = insert_gap(&wave, delay_ms, 10.0, 1.0);
        let twice = insert_gap(&once, delay_ms, 10.0, 1.0);
        let end = ms_to_samples(delay_ms + 10.0, 10_000.0);
        prop_assert_eq!(&once.samples()[end..], &twice.samples()[end..]);
    }
}

// ============================================================================
// Synthesis
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn silence_is_zero_of_nominal_length(
        duration_ms in 0.0f64..500.0,
        sample_rate in prop::sample::select(vec![24414.0625, 44100.0, 100_000.0]),
        level_db in 0.0f64..120.0,
    ) {
        let spec = StimulusSpec::silence()
            .with_duration(duration_ms)
            .with_sample_rate(sample_rate)
            .with_level(level_db, startle_core::OutputChannel::Startle);
        let wave = Synthesizer::seeded(0).synthesize(&spec).unwrap();
        prop_assert_eq!(wave.len(), ms_to_samples(duration_ms, sample_rate));
        prop_assert!(wave.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn train_length_fits_last_pulse(
        pulses in 1usize..6,
        interpulse_ms in 1.0f64..40.0,
        delay_ms in 0.0f64..30.0,
    ) {
        let sr = 20_000.0;
        let spec = StimulusSpec::tone(&[1000.0])
            .with_duration(10.0)
            .with_sample_rate(sr)
            .with_delay(delay_ms)
            .with_pulses(pulses, interpulse_ms);
        let wave = Synthesizer::seeded(0).synthesize(&spec).unwrap();
        let last_end = ms_to_samples(delay_ms, sr)
            + (pulses - 1) * ms_to_samples(interpulse_ms, sr)
            + spec.burst_len();
        prop_assert!(wave.len() >= last_end);
        prop_assert!(wave.len() <= last_end + pulses);
    }
}
