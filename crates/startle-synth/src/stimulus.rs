//! Calibrated stimulus synthesis.
//!
//! A [`StimulusSpec`] fully describes one sound: its mode, shape, timing,
//! pulse structure, and level. [`Synthesizer::synthesize`] turns it into a
//! [`Waveform`] in three steps:
//!
//! 1. Build one shaped burst of `duration_ms` (tone sum, white noise, or
//!    band-limited noise).
//! 2. Superpose `pulses` copies of the burst, `interpulse_ms` apart, after a
//!    leading `delay_ms` of silence, flipping every other copy when
//!    `alternate` is set.
//! 3. Scale by the calibrated gain for `level_db` on `channel`.
//!
//! Band-limited noise is enveloped before it is filtered, so its onset and
//! offset carry the filter's transients rather than a clean sin² taper.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use startle_analysis::{BandFilter, StopbandRule};
use startle_core::{Calibration, DspError, OutputChannel, Result, Waveform, ms_to_samples, rf_shape};

use crate::noise::NoiseSource;

/// Kind of sound a stimulus produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StimulusMode {
    /// No sound.
    Silence,
    /// Sum of sine components.
    #[default]
    Tone,
    /// Gaussian white noise.
    BroadbandNoise,
    /// Gaussian noise through an elliptic band-pass.
    BandpassNoise,
}

impl StimulusMode {
    /// Every mode, in display order.
    pub const ALL: [StimulusMode; 4] = [
        StimulusMode::Silence,
        StimulusMode::Tone,
        StimulusMode::BroadbandNoise,
        StimulusMode::BandpassNoise,
    ];

    /// Name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            StimulusMode::Silence => "silence",
            StimulusMode::Tone => "tone",
            StimulusMode::BroadbandNoise => "broadband-noise",
            StimulusMode::BandpassNoise => "bandpass-noise",
        }
    }
}

impl std::fmt::Display for StimulusMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything needed to synthesize one stimulus.
#[derive(Debug, Clone, PartialEq)]
pub struct StimulusSpec {
    /// What to generate.
    pub mode: StimulusMode,
    /// Peak amplitude of one burst before calibration.
    pub amplitude: f64,
    /// Tone frequencies, or `[low, high]` band edges for band-limited noise (Hz).
    pub frequencies: Vec<f64>,
    /// Silence before the first pulse (ms).
    pub delay_ms: f64,
    /// Length of one burst including its ramps (ms).
    pub duration_ms: f64,
    /// Rise and fall time of each burst (ms).
    pub rise_fall_ms: f64,
    /// Output sample rate (Hz).
    pub sample_rate: f64,
    /// Number of bursts in the train.
    pub pulses: usize,
    /// Onset-to-onset spacing of bursts (ms).
    pub interpulse_ms: f64,
    /// Invert every other burst.
    pub alternate: bool,
    /// Target level (dB SPL).
    pub level_db: f64,
    /// Speaker the level is calibrated for.
    pub channel: OutputChannel,
}

impl Default for StimulusSpec {
    fn default() -> Self {
        Self {
            mode: StimulusMode::Tone,
            amplitude: 1.0,
            frequencies: vec![1000.0],
            delay_ms: 0.0,
            duration_ms: 100.0,
            rise_fall_ms: 2.5,
            sample_rate: 44100.0,
            pulses: 1,
            interpulse_ms: 20.0,
            alternate: true,
            level_db: 70.0,
            channel: OutputChannel::Conditioning,
        }
    }
}

impl StimulusSpec {
    /// Zero-filled stimulus.
    pub fn silence() -> Self {
        Self {
            mode: StimulusMode::Silence,
            frequencies: Vec::new(),
            ..Self::default()
        }
    }

    /// Tone made of the given sine components.
    pub fn tone(frequencies: &[f64]) -> Self {
        Self {
            mode: StimulusMode::Tone,
            frequencies: frequencies.to_vec(),
            ..Self::default()
        }
    }

    /// White noise burst.
    pub fn broadband_noise() -> Self {
        Self {
            mode: StimulusMode::BroadbandNoise,
            frequencies: Vec::new(),
            ..Self::default()
        }
    }

    /// Noise band-limited to `low_hz..high_hz`.
    pub fn bandpass_noise(low_hz: f64, high_hz: f64) -> Self {
        Self {
            mode: StimulusMode::BandpassNoise,
            frequencies: vec![low_hz, high_hz],
            ..Self::default()
        }
    }

    /// Set the burst duration.
    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Set the leading silence.
    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Set the rise/fall time.
    pub fn with_rise_fall(mut self, rise_fall_ms: f64) -> Self {
        self.rise_fall_ms = rise_fall_ms;
        self
    }

    /// Set the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the target level and the channel it is calibrated for.
    pub fn with_level(mut self, level_db: f64, channel: OutputChannel) -> Self {
        self.level_db = level_db;
        self.channel = channel;
        self
    }

    /// Set the pre-calibration amplitude.
    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Make a train of `pulses` bursts spaced `interpulse_ms` apart.
    pub fn with_pulses(mut self, pulses: usize, interpulse_ms: f64) -> Self {
        self.pulses = pulses;
        self.interpulse_ms = interpulse_ms;
        self
    }

    /// Enable or disable polarity alternation within a train.
    pub fn with_alternate(mut self, alternate: bool) -> Self {
        self.alternate = alternate;
        self
    }

    /// Samples in one burst.
    pub fn burst_len(&self) -> usize {
        ms_to_samples(self.duration_ms, self.sample_rate)
    }

    fn band(&self) -> Result<(f64, f64)> {
        match self.frequencies.as_slice() {
            [low, high, ..] => Ok((*low, *high)),
            _ => Err(DspError::filter_spec(
                "band-limited noise needs a low and a high edge",
            )),
        }
    }
}

/// Turns [`StimulusSpec`]s into calibrated waveforms.
///
/// Owns the noise generator and a cache of band filters, so repeated noise
/// bursts with the same band skip the elliptic design. The cache holds at
/// most [`MAX_CACHED_FILTERS`] designs and is cleared when a new band would
/// exceed that.
///
/// # Example
///
/// ```rust
/// use startle_core::OutputChannel;
/// use startle_synth::{StimulusSpec, Synthesizer};
///
/// let mut synth = Synthesizer::seeded(1);
/// let spec = StimulusSpec::tone(&[4000.0])
///     .with_duration(50.0)
///     .with_sample_rate(100_000.0)
///     .with_level(86.0, OutputChannel::Conditioning);
/// let wave = synth.synthesize(&spec).unwrap();
/// assert_eq!(wave.len(), 5000);
/// assert!((wave.peak() - 2.0).abs() < 1e-2);
/// ```
/// Band filter designs a [`Synthesizer`] keeps before starting over.
///
/// A trial layout uses two bands (prepulse and startle) per sample rate.
pub const MAX_CACHED_FILTERS: usize = 8;

#[derive(Debug, Clone)]
pub struct Synthesizer {
    noise: NoiseSource,
    calibration: Calibration,
    filters: HashMap<[u64; 3], BandFilter>,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(NoiseSource::from_entropy(), Calibration::default())
    }
}

impl Synthesizer {
    /// Synthesizer drawing noise from `noise` and scaling with `calibration`.
    pub fn new(noise: NoiseSource, calibration: Calibration) -> Self {
        Self {
            noise,
            calibration,
            filters: HashMap::new(),
        }
    }

    /// Deterministic synthesizer with the default calibration.
    pub fn seeded(seed: u64) -> Self {
        Self::new(NoiseSource::seeded(seed), Calibration::default())
    }

    /// Calibration in use.
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Replace the calibration.
    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    /// Build the waveform described by `spec`.
    ///
    /// Silence returns one burst length of zeros with no delay or pulse
    /// structure. A tone with no frequencies is silent but still carries the
    /// delay and pulse layout.
    ///
    /// # Errors
    ///
    /// [`DspError::InvalidFilterSpec`] if band-limited noise is requested with
    /// fewer than two edges or edges the elliptic design cannot realize.
    pub fn synthesize(&mut self, spec: &StimulusSpec) -> Result<Waveform> {
        let sr = spec.sample_rate;
        let env = rf_shape(0.0, spec.duration_ms, sr, spec.rise_fall_ms);

        let burst: Vec<f64> = match spec.mode {
            StimulusMode::Silence => return Ok(Waveform::silence(env.len(), sr)),
            StimulusMode::Tone => {
                let mut burst = vec![0.0; env.len()];
                for &freq in &spec.frequencies {
                    let w = 2.0 * PI * freq / sr;
                    for (j, (b, g)) in burst.iter_mut().zip(&env).enumerate() {
                        *b += g * spec.amplitude * (w * j as f64).sin();
                    }
                }
                burst
            }
            StimulusMode::BroadbandNoise => self.shaped_noise(&env, spec.amplitude),
            StimulusMode::BandpassNoise => {
                let (low, high) = spec.band()?;
                let raw = self.shaped_noise(&env, spec.amplitude);
                self.band_filter(low, high, sr)?.apply(&raw)
            }
        };

        let gain = self.calibration.gain_for_level(spec.level_db, spec.channel);
        let samples = pulse_train(&burst, spec)
            .into_iter()
            .map(|s| s * gain)
            .collect::<Vec<_>>();

        tracing::debug!(
            mode = %spec.mode,
            level_db = spec.level_db,
            gain,
            samples = samples.len(),
            "stimulus synthesized"
        );
        Ok(Waveform::new(samples, sr))
    }

    fn shaped_noise(&mut self, env: &[f64], amplitude: f64) -> Vec<f64> {
        self.noise
            .gaussian(env.len())
            .into_iter()
            .zip(env)
            .map(|(n, g)| g * amplitude * n)
            .collect()
    }

    fn band_filter(&mut self, low_hz: f64, high_hz: f64, sample_rate: f64) -> Result<&BandFilter> {
        let key = [low_hz.to_bits(), high_hz.to_bits(), sample_rate.to_bits()];
        if self.filters.len() >= MAX_CACHED_FILTERS && !self.filters.contains_key(&key) {
            tracing::debug!(cached = self.filters.len(), "band filter cache full, clearing");
            self.filters.clear();
        }
        let filter = match self.filters.entry(key) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                e.insert(BandFilter::design(low_hz, high_hz, sample_rate, StopbandRule::Narrow)?)
            }
        };
        Ok(filter)
    }
}

/// Lay `burst` out as a train described by `spec`.
fn pulse_train(burst: &[f64], spec: &StimulusSpec) -> Vec<f64> {
    let sr = spec.sample_rate;
    let pulses = spec.pulses.max(1);
    let jd = ms_to_samples(spec.delay_ms, sr);
    let step = ms_to_samples(spec.interpulse_ms, sr);
    let span = (spec.interpulse_ms * (pulses - 1) as f64 * sr / 1000.0).ceil().max(0.0) as usize;

    let mut out = vec![0.0; span + jd + burst.len()];
    for i in 0..pulses {
        let sign = if spec.alternate && i % 2 == 1 { -1.0 } else { 1.0 };
        let start = jd + i * step;
        for (o, b) in out[start..start + burst.len()].iter_mut().zip(burst) {
            *o += sign * b;
        }
    }
    out
}
