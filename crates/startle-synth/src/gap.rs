//! Silent gaps cut into an existing waveform.

use startle_core::{Waveform, rf_shape};

/// Cut a shaped gap into `wave`.
///
/// A rise/fall envelope is built over `[delay_ms, delay_ms + duration_ms]`
/// and the result is `wave × (1 − envelope)`: samples outside the window are
/// untouched, samples inside are faded smoothly to zero.
///
/// Whichever of the wave and the envelope is shorter is zero-padded to the
/// other's length, so a gap that runs past the end of `wave` lengthens the
/// output with silence.
///
/// # Example
///
/// ```rust
/// use startle_core::Waveform;
/// use startle_synth::insert_gap;
///
/// let wave = Waveform::new(vec![1.0; 100], 1000.0);
/// let gapped = insert_gap(&wave, 40.0, 20.0, 2.5);
/// assert_eq!(gapped.samples()[10], 1.0);
/// assert_eq!(gapped.samples()[50], 0.0);
/// ```
pub fn insert_gap(wave: &Waveform, delay_ms: f64, duration_ms: f64, rise_fall_ms: f64) -> Waveform {
    let env = rf_shape(delay_ms, duration_ms, wave.sample_rate(), rise_fall_ms);
    let len = wave.len().max(env.len());

    let samples = (0..len)
        .map(|i| {
            let w = wave.samples().get(i).copied().unwrap_or(0.0);
            let g = env.get(i).copied().unwrap_or(0.0);
            w * (1.0 - g)
        })
        .collect();

    Waveform::new(samples, wave.sample_rate())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outside_window_untouched() {
        let wave = Waveform::new((0..500).map(|i| (i as f64 * 0.3).sin()).collect(), 10_000.0);
        let gapped = insert_gap(&wave, 10.0, 20.0, 2.5);
        assert_eq!(gapped.len(), 500);
        // Window is samples 100..300
        assert_eq!(&gapped.samples()[..100], &wave.samples()[..100]);
        assert_eq!(&gapped.samples()[300..], &wave.samples()[300..]);
        // Plateau fully silent
        assert!(gapped.samples()[130..270].iter().all(|&s| s.abs() < 1e-12));
    }

    #[test]
    fn longer_envelope_extends_with_zeros() {
        let wave = Waveform::new(vec![1.0; 50], 1000.0);
        let gapped = insert_gap(&wave, 40.0, 30.0, 1.0);
        assert_eq!(gapped.len(), 70);
        assert_eq!(gapped.samples()[30], 1.0);
        assert!(gapped.samples()[50..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn zero_duration_is_identity() {
        let wave = Waveform::new(vec![0.5; 64], 1000.0);
        assert_eq!(insert_gap(&wave, 10.0, 0.0, 2.5), wave);
    }
}
