//! Startle Synth - stimulus generation for acoustic startle experiments
//!
//! # Stimuli
//!
//! - [`StimulusSpec`] - Mode, timing, pulse train, and level of one sound
//! - [`StimulusMode`] - Silence, tone, broadband noise, band-limited noise
//! - [`Synthesizer`] - Turns specs into calibrated [`startle_core::Waveform`]s
//!
//! ```rust
//! use startle_synth::{StimulusSpec, Synthesizer};
//!
//! let mut synth = Synthesizer::seeded(42);
//! let noise = synth
//!     .synthesize(&StimulusSpec::bandpass_noise(4000.0, 16000.0).with_sample_rate(100_000.0))
//!     .unwrap();
//! assert_eq!(noise.len(), 10_000);
//! ```
//!
//! # Gaps
//!
//! - [`insert_gap`] - Fade a window of an existing waveform to silence
//!
//! # Trials
//!
//! - [`TrialPlan`] - Randomized gap/no-gap order with ITI and duration jitter
//! - [`TrialComposer`] - Background, gap or prepulse, and startle for one trial
//!
//! # Noise
//!
//! - [`NoiseSource`] - Seeded Gaussian samples

pub mod gap;
pub mod noise;
pub mod plan;
pub mod stimulus;
pub mod trial;

pub use gap::insert_gap;
pub use noise::NoiseSource;
pub use plan::{PlanSettings, PlannedTrial, TrialPlan};
pub use stimulus::{MAX_CACHED_FILTERS, StimulusMode, StimulusSpec, Synthesizer};
pub use trial::{TRIAL_RISE_FALL_MS, TrialComposer, TrialLayout, TrialStimulus};
