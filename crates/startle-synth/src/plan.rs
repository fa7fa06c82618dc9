//! Randomized trial sequence for one experiment run.
//!
//! A run starts with `habituation` no-gap trials, followed by `count` test
//! trials in shuffled order, half of them gap trials. Each trial also draws
//! its inter-trial interval and conditioning duration uniformly around the
//! configured values.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Parameters a plan is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanSettings {
    /// Test trials after habituation.
    pub count: usize,
    /// Leading no-gap trials excluded from analysis.
    pub habituation: usize,
    /// Mean inter-trial interval (s).
    pub iti_s: f64,
    /// Full width of the uniform ITI jitter (s).
    pub iti_variation_s: f64,
    /// Mean conditioning duration (ms).
    pub conditioning_ms: f64,
    /// Full width of the uniform conditioning jitter (ms).
    pub conditioning_variation_ms: f64,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            count: 10,
            habituation: 0,
            iti_s: 20.0,
            iti_variation_s: 0.0,
            conditioning_ms: 200.0,
            conditioning_variation_ms: 0.0,
        }
    }
}

/// One planned trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannedTrial {
    /// Position in the run, from 0.
    pub index: usize,
    /// Whether a gap (or prepulse) precedes the startle.
    pub is_gap: bool,
    /// Whether this is a habituation trial.
    pub habituation: bool,
    /// Interval before the next trial (s).
    pub iti_s: f64,
    /// Conditioning stimulus duration before the prepulse window (ms).
    pub conditioning_ms: f64,
}

/// Ordered trials of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialPlan {
    trials: Vec<PlannedTrial>,
}

impl TrialPlan {
    /// Draw a plan.
    ///
    /// Test trials are balanced: `count / 2` gap trials, the rest (one extra
    /// when `count` is odd) without.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    /// use startle_synth::{PlanSettings, TrialPlan};
    ///
    /// let settings = PlanSettings { count: 8, habituation: 2, ..PlanSettings::default() };
    /// let plan = TrialPlan::generate(&settings, &mut StdRng::seed_from_u64(3));
    /// assert_eq!(plan.len(), 10);
    /// assert_eq!(plan.gap_list().iter().filter(|&&g| g).count(), 4);
    /// ```
    pub fn generate<R: Rng + ?Sized>(settings: &PlanSettings, rng: &mut R) -> Self {
        let total = settings.count + settings.habituation;

        let mut gaps: Vec<bool> = (0..settings.count).map(|i| i % 2 == 1).collect();
        gaps.shuffle(rng);

        let trials = (0..total)
            .map(|index| {
                let habituation = index < settings.habituation;
                let is_gap = !habituation && gaps[index - settings.habituation];
                let iti_s = settings.iti_s + settings.iti_variation_s * (rng.gen_range(0.0..1.0) - 0.5);
                let conditioning_ms = settings.conditioning_ms
                    + settings.conditioning_variation_ms * (rng.gen_range(0.0..1.0) - 0.5);
                PlannedTrial {
                    index,
                    is_gap,
                    habituation,
                    iti_s,
                    conditioning_ms,
                }
            })
            .collect();

        tracing::debug!(total, habituation = settings.habituation, "trial plan drawn");
        Self { trials }
    }

    /// Plan from explicit trials, e.g. read back from a recording.
    pub fn from_trials(trials: Vec<PlannedTrial>) -> Self {
        Self { trials }
    }

    /// Number of trials.
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// True if the plan holds no trials.
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Trial at `index`.
    pub fn get(&self, index: usize) -> Option<&PlannedTrial> {
        self.trials.get(index)
    }

    /// All trials in order.
    pub fn trials(&self) -> &[PlannedTrial] {
        &self.trials
    }

    /// Gap flag of every trial, habituation included.
    pub fn gap_list(&self) -> Vec<bool> {
        self.trials.iter().map(|t| t.is_gap).collect()
    }

    /// Seconds from the start of the run to the start of each trial.
    pub fn start_times(&self) -> Vec<f64> {
        self.trials
            .iter()
            .scan(0.0, |elapsed, t| {
                let start = *elapsed;
                *elapsed += t.iti_s;
                Some(start)
            })
            .collect()
    }
}
