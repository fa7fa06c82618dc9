//! Per-trial startle response scoring.
//!
//! Each trial's response window is reduced to an RMS magnitude, appended to
//! the gap or no-gap population, and the two populations are compared with
//! a d-prime statistic:
//!
//! ```text
//! d' = (mean_nogap - mean_gap) / sqrt(std_nogap² + std_gap²)
//! ratio = mean_gap / mean_nogap
//! ```
//!
//! Standard deviations are population (divide by N) and stay zero until a
//! population holds two magnitudes. While either is zero, both d' and the
//! ratio are reported as zero.

use crate::dynamics::rms;
use serde::Serialize;
use startle_core::{Result, ensure_finite};

/// Running statistics for one trial population.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PopulationStats {
    /// Every magnitude scored so far, in order.
    pub magnitudes: Vec<f64>,
    /// Mean magnitude.
    pub mean: f64,
    /// Population standard deviation (zero until two magnitudes exist).
    pub std: f64,
    #[serde(skip)]
    m2: f64,
}

impl PopulationStats {
    /// Number of magnitudes scored.
    pub fn count(&self) -> usize {
        self.magnitudes.len()
    }

    fn push(&mut self, magnitude: f64) {
        self.magnitudes.push(magnitude);
        let n = self.magnitudes.len() as f64;
        let delta = magnitude - self.mean;
        self.mean += delta / n;
        self.m2 += delta * (magnitude - self.mean);
        if self.magnitudes.len() >= 2 {
            self.std = (self.m2 / n).sqrt();
        }
    }
}

/// Gap and no-gap populations for one experiment run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrialStatistics {
    /// Trials where the background had a gap (or a prepulse).
    pub gap: PopulationStats,
    /// Trials without a gap.
    pub no_gap: PopulationStats,
}

/// Derived discriminability of the two populations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Discriminability {
    /// `(mean_nogap - mean_gap) / sqrt(std_nogap² + std_gap²)`.
    pub dprime: f64,
    /// `mean_gap / mean_nogap`.
    pub ratio: f64,
}

impl TrialStatistics {
    /// Current d' and ratio.
    pub fn discriminability(&self) -> Discriminability {
        let (g, n) = (&self.gap, &self.no_gap);
        if g.std == 0.0 || n.std == 0.0 {
            return Discriminability::default();
        }
        let dprime = (n.mean - g.mean) / (n.std.powi(2) + g.std.powi(2)).sqrt();
        let ratio = if n.mean != 0.0 { g.mean / n.mean } else { 0.0 };
        Discriminability { dprime, ratio }
    }
}

/// Online analyzer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerState {
    /// No run started yet.
    Uninitialized,
    /// Statistics are being accumulated.
    Accumulating,
}

/// Accumulates trial magnitudes and reports discriminability after each one.
///
/// # Example
///
/// ```rust
/// use startle_analysis::TrialResponseAnalyzer;
///
/// let mut analyzer = TrialResponseAnalyzer::new();
/// // Trial 0 starts the run
/// let r = analyzer.score(0, &[], false).unwrap();
/// assert_eq!(r.dprime, 0.0);
///
/// analyzer.score(1, &[1.0, -1.0], false).unwrap();
/// let r = analyzer.score(2, &[0.5, -0.5], true).unwrap();
/// assert_eq!(r.dprime, 0.0); // one sample per population
/// ```
#[derive(Debug, Clone)]
pub struct TrialResponseAnalyzer {
    stats: TrialStatistics,
    state: AnalyzerState,
}

impl Default for TrialResponseAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl TrialResponseAnalyzer {
    /// A fresh analyzer awaiting its first run.
    pub fn new() -> Self {
        Self {
            stats: TrialStatistics::default(),
            state: AnalyzerState::Uninitialized,
        }
    }

    /// Clear both populations and start accumulating.
    pub fn reset(&mut self) {
        self.stats = TrialStatistics::default();
        self.state = AnalyzerState::Accumulating;
    }

    /// Current state.
    pub fn state(&self) -> AnalyzerState {
        self.state
    }

    /// Statistics accumulated so far.
    pub fn statistics(&self) -> &TrialStatistics {
        &self.stats
    }

    /// Current discriminability without scoring anything.
    pub fn discriminability(&self) -> Discriminability {
        self.stats.discriminability()
    }

    /// Score one trial of a run.
    ///
    /// Trial index 0 starts the run: statistics are reset and a zero result is
    /// returned without looking at `signal`. Any other index scores `signal`
    /// (already sliced to the analysis window) into the matching population.
    ///
    /// # Errors
    ///
    /// [`startle_core::DspError::InvalidSample`] if `signal` is empty or holds a
    /// non-finite value. The statistics are left untouched.
    pub fn score(&mut self, trial_index: usize, signal: &[f64], is_gap: bool) -> Result<Discriminability> {
        if trial_index == 0 {
            self.reset();
            return Ok(Discriminability::default());
        }
        self.accumulate(signal, is_gap).inspect(|r| {
            tracing::debug!(trial_index, is_gap, dprime = r.dprime, ratio = r.ratio, "trial scored");
        })
    }

    /// Score `signal` into a population regardless of trial index.
    pub fn accumulate(&mut self, signal: &[f64], is_gap: bool) -> Result<Discriminability> {
        ensure_finite(signal)?;
        if self.state == AnalyzerState::Uninitialized {
            tracing::warn!("scoring before reset, starting a new run");
            self.reset();
        }

        let magnitude = rms(signal);
        if is_gap {
            self.stats.gap.push(magnitude);
        } else {
            self.stats.no_gap.push(magnitude);
        }
        Ok(self.stats.discriminability())
    }
}
