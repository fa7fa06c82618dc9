//! Two-channel stimulus for one startle trial.
//!
//! Timeline of a trial (ms from the start of playback):
//!
//! ```text
//! 0            cond          cond+pp        onset           onset+startle
//! |-- background --|-- gap/prepulse --|-- prestartle --|-- startle --|
//! ```
//!
//! The left channel carries the background across the whole timeline, with a
//! gap cut into it and/or a prepulse added on gap trials. The right channel
//! carries the band-limited startle burst starting at `onset`.

use startle_core::{OutputChannel, Result, Waveform};

use crate::gap::insert_gap;
use crate::stimulus::{StimulusMode, StimulusSpec, Synthesizer};

/// Ramp length used for every trial component.
pub const TRIAL_RISE_FALL_MS: f64 = 2.5;

/// Fixed parameters shared by every trial of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialLayout {
    /// Background sound.
    pub conditioning_mode: StimulusMode,
    /// Background level (dB SPL).
    pub conditioning_level_db: f64,
    /// Prepulse sound on gap trials; silence means a pure gap.
    pub prepulse_mode: StimulusMode,
    /// Prepulse level (dB SPL).
    pub prepulse_level_db: f64,
    /// Length of the gap/prepulse window (ms).
    pub prepulse_ms: f64,
    /// Cut a gap even when a prepulse sound is present.
    pub gap: bool,
    /// Tone frequency for tone backgrounds and prepulses (Hz).
    pub tone_hz: f64,
    /// `[low, high]` band for band-limited backgrounds and prepulses (Hz).
    pub band_hz: [f64; 2],
    /// Silence between the gap/prepulse window and the startle (ms).
    pub prestartle_ms: f64,
    /// Startle burst length (ms).
    pub startle_ms: f64,
    /// Startle level (dB SPL, startle speaker calibration).
    pub startle_level_db: f64,
    /// `[low, high]` band of the startle noise (Hz).
    pub startle_band_hz: [f64; 2],
    /// Output sample rate (Hz).
    pub sample_rate: f64,
}

impl Default for TrialLayout {
    fn default() -> Self {
        Self {
            conditioning_mode: StimulusMode::BandpassNoise,
            conditioning_level_db: 70.0,
            prepulse_mode: StimulusMode::Silence,
            prepulse_level_db: 70.0,
            prepulse_ms: 20.0,
            gap: true,
            tone_hz: 4000.0,
            band_hz: [4000.0, 16000.0],
            prestartle_ms: 100.0,
            startle_ms: 20.0,
            startle_level_db: 100.0,
            startle_band_hz: [1000.0, 32000.0],
            sample_rate: 100_000.0,
        }
    }
}

impl TrialLayout {
    /// Frequencies a background or prepulse of `mode` is built from.
    fn frequencies(&self, mode: StimulusMode) -> Vec<f64> {
        match mode {
            StimulusMode::Tone => vec![self.tone_hz],
            StimulusMode::BandpassNoise => self.band_hz.to_vec(),
            StimulusMode::Silence | StimulusMode::BroadbandNoise => Vec::new(),
        }
    }

    /// Startle onset for a trial with the given conditioning duration (ms).
    pub fn startle_onset_ms(&self, conditioning_ms: f64) -> f64 {
        conditioning_ms + self.prepulse_ms + self.prestartle_ms
    }

    fn spec(&self, mode: StimulusMode, level_db: f64, channel: OutputChannel) -> StimulusSpec {
        StimulusSpec {
            mode,
            frequencies: self.frequencies(mode),
            rise_fall_ms: TRIAL_RISE_FALL_MS,
            sample_rate: self.sample_rate,
            level_db,
            channel,
            ..StimulusSpec::default()
        }
    }
}

/// Left and right output channels for one trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialStimulus {
    /// Background, gap, and prepulse.
    pub left: Waveform,
    /// Startle burst.
    pub right: Waveform,
    /// Startle onset (ms from the start of playback).
    pub onset_ms: f64,
}

impl TrialStimulus {
    /// Samples per channel (both are the same length).
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// True if neither channel holds samples.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// Builds [`TrialStimulus`] values from a fixed [`TrialLayout`].
///
/// # Example
///
/// ```rust
/// use startle_synth::{Synthesizer, TrialComposer, TrialLayout};
///
/// let mut composer = TrialComposer::new(TrialLayout::default(), Synthesizer::seeded(1));
/// let trial = composer.compose(200.0, true).unwrap();
/// assert_eq!(trial.left.len(), trial.right.len());
/// assert_eq!(trial.onset_ms, 320.0);
/// ```
#[derive(Debug, Clone)]
pub struct TrialComposer {
    layout: TrialLayout,
    synth: Synthesizer,
}

impl TrialComposer {
    /// Composer for `layout`, drawing sounds from `synth`.
    pub fn new(layout: TrialLayout, synth: Synthesizer) -> Self {
        Self { layout, synth }
    }

    /// Layout in use.
    pub fn layout(&self) -> &TrialLayout {
        &self.layout
    }

    /// Compose one trial whose background runs `conditioning_ms` before the
    /// gap/prepulse window.
    ///
    /// # Errors
    ///
    /// Fails with [`startle_core::DspError::InvalidFilterSpec`] if any
    /// band-limited component has edges the output rate cannot realize.
    pub fn compose(&mut self, conditioning_ms: f64, is_gap: bool) -> Result<TrialStimulus> {
        let l = &self.layout;
        let onset_ms = l.startle_onset_ms(conditioning_ms);

        let background = l
            .spec(l.conditioning_mode, l.conditioning_level_db, OutputChannel::Conditioning)
            .with_duration(onset_ms + l.startle_ms);
        let startle = StimulusSpec {
            frequencies: l.startle_band_hz.to_vec(),
            ..l.spec(StimulusMode::BandpassNoise, l.startle_level_db, OutputChannel::Startle)
        }
        .with_delay(onset_ms)
        .with_duration(l.startle_ms);

        let prepulse_mode = l.prepulse_mode;
        let cut_gap = is_gap && (prepulse_mode == StimulusMode::Silence || l.gap);
        let prepulse = (is_gap && prepulse_mode != StimulusMode::Silence).then(|| {
            l.spec(prepulse_mode, l.prepulse_level_db, OutputChannel::Conditioning)
                .with_delay(conditioning_ms)
                .with_duration(l.prepulse_ms)
        });
        let prepulse_ms = l.prepulse_ms;

        let mut left = self.synth.synthesize(&background)?;
        if cut_gap {
            left = insert_gap(&left, conditioning_ms, prepulse_ms, TRIAL_RISE_FALL_MS);
        }
        if let Some(spec) = prepulse {
            left = left.mix(&self.synth.synthesize(&spec)?);
        }
        let right = self.synth.synthesize(&startle)?;

        let len = left.len().max(right.len());
        tracing::debug!(conditioning_ms, is_gap, cut_gap, onset_ms, samples = len, "trial composed");
        Ok(TrialStimulus {
            left: left.padded_to(len),
            right: right.padded_to(len),
            onset_ms,
        })
    }
}
