//! Elliptic band filters for noise shaping and response analysis.
//!
//! Two stopband conventions are in use and are kept separate per call site:
//!
//! | Rule | Lower stopband | Upper stopband | Used by |
//! |------|----------------|----------------|---------|
//! | [`StopbandRule::Narrow`] | 0.75 × low | 1.25 × high | band-limited noise stimuli |
//! | [`StopbandRule::Wide`] | 0.5 × low | 2 × high | response channel filtering |
//!
//! Both designs use 1 dB passband ripple and 60 dB stopband attenuation.

use crate::elliptic::{design_bandpass, validate_edges};
use startle_core::{DspError, Result, SosFilter};

/// Maximum passband loss in dB.
pub const PASSBAND_RIPPLE_DB: f64 = 1.0;

/// Minimum stopband attenuation in dB.
pub const STOPBAND_ATTENUATION_DB: f64 = 60.0;

/// How far the stopband edges sit outside the passband.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopbandRule {
    /// Stopband at `[0.75·low, 1.25·high]`.
    Narrow,
    /// Stopband at `[0.5·low, 2·high]`.
    Wide,
}

impl StopbandRule {
    fn factors(self) -> (f64, f64) {
        match self {
            StopbandRule::Narrow => (0.75, 1.25),
            StopbandRule::Wide => (0.5, 2.0),
        }
    }
}

/// Passband and stopband edges normalized to Nyquist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandEdges {
    /// `[low, high]` passband edges.
    pub passband: [f64; 2],
    /// `[low, high]` stopband edges.
    pub stopband: [f64; 2],
}

impl BandEdges {
    /// Normalize `low_hz..high_hz` against `sample_rate` using `rule`.
    pub fn new(low_hz: f64, high_hz: f64, sample_rate: f64, rule: StopbandRule) -> Result<Self> {
        if !(sample_rate > 0.0) {
            return Err(DspError::filter_spec(format!(
                "sample rate {sample_rate} must be positive"
            )));
        }
        if !(low_hz < high_hz) {
            return Err(DspError::filter_spec(format!(
                "low edge {low_hz} Hz must be below high edge {high_hz} Hz"
            )));
        }
        let nyquist = sample_rate / 2.0;
        let (lo, hi) = rule.factors();
        Ok(Self {
            passband: [low_hz / nyquist, high_hz / nyquist],
            stopband: [lo * low_hz / nyquist, hi * high_hz / nyquist],
        })
    }

    /// Confirm the elliptic design can realize these edges without running it.
    pub fn check(&self) -> Result<()> {
        validate_edges(self.passband, self.stopband)
    }
}

/// A designed band-pass ready to run over signals.
#[derive(Debug, Clone)]
pub struct BandFilter {
    sos: SosFilter,
    order: usize,
    edges: BandEdges,
}

impl BandFilter {
    /// Design a band-pass between `low_hz` and `high_hz`.
    ///
    /// # Errors
    ///
    /// [`DspError::InvalidFilterSpec`] if the edges are inverted or any
    /// passband or stopband edge falls outside `(0, Nyquist)`.
    pub fn design(low_hz: f64, high_hz: f64, sample_rate: f64, rule: StopbandRule) -> Result<Self> {
        let edges = BandEdges::new(low_hz, high_hz, sample_rate, rule)?;
        let (sos, order) = design_bandpass(
            edges.passband,
            edges.stopband,
            PASSBAND_RIPPLE_DB,
            STOPBAND_ATTENUATION_DB,
        )?;
        tracing::debug!(low_hz, high_hz, sample_rate, order, ?rule, "band filter designed");
        Ok(Self { sos, order, edges })
    }

    /// Prototype order selected by the design.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Normalized edges the filter was designed for.
    pub fn edges(&self) -> BandEdges {
        self.edges
    }

    /// The underlying second-order sections.
    pub fn sos(&self) -> &SosFilter {
        &self.sos
    }

    /// Causal forward filter; output length equals input length.
    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        self.sos.filter(signal)
    }
}

/// Band-pass `signal` between `low_hz` (the high-pass corner) and `high_hz`
/// (the low-pass corner) with the wide stopband rule.
///
/// # Example
///
/// ```rust
/// use startle_analysis::band_filter;
///
/// let sr = 24414.0625;
/// let x: Vec<f64> = (0..2048).map(|i| (i as f64 * 0.1).sin()).collect();
/// let y = band_filter(&x, 50.0, 1000.0, sr).unwrap();
/// assert_eq!(y.len(), x.len());
///
/// assert!(band_filter(&x, 1000.0, 50.0, sr).is_err());
/// ```
pub fn band_filter(signal: &[f64], low_hz: f64, high_hz: f64, sample_rate: f64) -> Result<Vec<f64>> {
    let filter = BandFilter::design(low_hz, high_hz, sample_rate, StopbandRule::Wide)?;
    Ok(filter.apply(signal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(freq: f64, sr: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / sr).sin()).collect()
    }

    fn tail_rms(x: &[f64]) -> f64 {
        crate::dynamics::rms(&x[3 * x.len() / 4..])
    }

    #[test]
    fn edges_follow_rule() {
        let narrow = BandEdges::new(1000.0, 4000.0, 20000.0, StopbandRule::Narrow).unwrap();
        assert_eq!(narrow.passband, [0.1, 0.4]);
        assert!((narrow.stopband[0] - 0.075).abs() < 1e-12);
        assert!((narrow.stopband[1] - 0.5).abs() < 1e-12);

        let wide = BandEdges::new(1000.0, 4000.0, 20000.0, StopbandRule::Wide).unwrap();
        assert!((wide.stopband[0] - 0.05).abs() < 1e-12);
        assert!((wide.stopband[1] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn check_matches_design() {
        let ok = BandEdges::new(50.0, 1000.0, 24414.0625, StopbandRule::Wide).unwrap();
        assert!(ok.check().is_ok());
        let beyond = BandEdges::new(1000.0, 32000.0, 44100.0, StopbandRule::Narrow).unwrap();
        assert!(matches!(beyond.check(), Err(DspError::InvalidFilterSpec(_))));
    }

    #[test]
    fn passes_in_band_and_rejects_out_of_band() {
        let sr = 24414.0625;
        let n = 32768;
        let pass = band_filter(&tone(300.0, sr, n), 50.0, 1000.0, sr).unwrap();
        let stop = band_filter(&tone(5000.0, sr, n), 50.0, 1000.0, sr).unwrap();

        let in_rms = tail_rms(&pass);
        assert!(in_rms > 0.6 && in_rms < 0.75, "passband rms {in_rms}");
        assert!(tail_rms(&stop) < 1e-3, "stopband rms {}", tail_rms(&stop));
    }

    #[test]
    fn output_length_matches_input() {
        let y = band_filter(&[1.0; 17], 100.0, 200.0, 1000.0).unwrap();
        assert_eq!(y.len(), 17);
    }

    #[test]
    fn invalid_edges_fail() {
        let sr = 1000.0;
        for (lo, hi) in [(200.0, 100.0), (0.0, 100.0), (100.0, 600.0), (100.0, 300.0)] {
            assert!(
                matches!(band_filter(&[0.0], lo, hi, sr), Err(DspError::InvalidFilterSpec(_))),
                "{lo}..{hi} should fail"
            );
        }
    }

    #[test]
    fn narrow_rule_gives_higher_order() {
        let narrow = BandFilter::design(1000.0, 4000.0, 20000.0, StopbandRule::Narrow).unwrap();
        let wide = BandFilter::design(1000.0, 4000.0, 20000.0, StopbandRule::Wide).unwrap();
        assert!(narrow.order() >= wide.order());
        assert_eq!(narrow.sos().order(), 2 * narrow.order());
    }
}
