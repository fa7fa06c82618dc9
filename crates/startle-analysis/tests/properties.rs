//! Property-based tests for the spectral estimator.
//!
//! Padding rule and one-sided spectrum shape over randomized lengths and
//! signals.

use proptest::prelude::*;
use startle_analysis::{padded_len, power_spectrum};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The transform length covers the input and is a power of two no more
    /// than twice its size.
    #[test]
    fn padded_len_is_enclosing_power_of_two(n in 1usize..100_000) {
        let padded = padded_len(n);
        prop_assert!(padded >= n, "n={} padded={}", n, padded);
        prop_assert!(padded.is_power_of_two(), "n={} padded={}", n, padded);
        prop_assert!(padded <= 2 * n.max(1), "n={} padded={}", n, padded);
        if n.is_power_of_two() && n > 1 {
            prop_assert_eq!(padded, n);
        }
    }

    /// One bin per non-negative frequency, all power non-negative, axis from
    /// DC to Nyquist.
    #[test]
    fn spectrum_is_one_sided_and_non_negative(
        signal in prop::collection::vec(-10.0f64..10.0, 1..2048),
        sr in prop::sample::select(vec![1000.0, 24414.0625, 100_000.0]),
    ) {
        let spec = power_spectrum(&signal, sr).unwrap();
        let n_unique = spec.fft_size / 2 + 1;

        prop_assert_eq!(spec.fft_size, padded_len(signal.len()));
        prop_assert_eq!(spec.power.len(), n_unique);
        prop_assert_eq!(spec.frequencies.len(), n_unique);
        prop_assert!(spec.power.iter().all(|p| p.is_finite() && *p >= 0.0));

        prop_assert_eq!(spec.frequencies[0], 0.0);
        prop_assert!(spec.frequencies.windows(2).all(|w| w[1] > w[0]));
        let last = spec.frequencies[n_unique - 1];
        prop_assert!(last <= sr / 2.0 + 1e-9, "last bin {} above Nyquist", last);
    }
}
