//! Acquisition hardware boundary.
//!
//! A trial is one synchronous play-and-record cycle: the two stimulus
//! channels go out, and the response transducer (channel 1) and microphone
//! (channel 2) come back at the input rate, extended by a post-stimulus
//! recording period. [`HardwareIo`] is the seam; the session runner does not
//! know whether a sound card, a DAQ with programmable attenuators, or
//! [`SimulatedChamber`] sits behind it.

use crate::{Error, Result};
use rand::Rng;
use startle_core::{Waveform, ms_to_samples};
use startle_synth::NoiseSource;
use std::f64::consts::PI;

/// Analog output limit in volts. Stimulus samples beyond it are clipped.
pub const OUTPUT_LIMIT_VOLTS: f64 = 10.0;

/// The two channels recorded during one trial.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    /// Response transducer, volts.
    pub channel1: Vec<f64>,
    /// Microphone, volts.
    pub channel2: Vec<f64>,
    /// Input sample rate in Hz.
    pub sample_rate: f64,
    /// Whether the stimulus had to be clipped to [`OUTPUT_LIMIT_VOLTS`].
    pub clipped: bool,
}

impl Capture {
    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channel1.len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.channel1.is_empty()
    }

    /// Sample times in seconds.
    pub fn time_axis(&self) -> Vec<f64> {
        (0..self.len()).map(|i| i as f64 / self.sample_rate).collect()
    }
}

/// A device that plays a stereo stimulus and records two channels.
///
/// ## Implementing a device
///
/// ```rust,ignore
/// struct Rig { /* DAQ task, attenuators, ... */ }
///
/// impl HardwareIo for Rig {
///     fn name(&self) -> &str { "nidaq+rp2" }
///     fn output_sample_rate(&self) -> f64 { 100_000.0 }
///     fn input_sample_rate(&self) -> f64 { 24414.0625 }
///     fn play(&mut self, left: &Waveform, right: &Waveform, post_duration_s: f64) -> Result<Capture> {
///         // clip, write, trigger, wait, read back
///         todo!()
///     }
/// }
/// ```
pub trait HardwareIo {
    /// Human-readable device name.
    fn name(&self) -> &str;

    /// Rate the stimulus must be synthesized at, Hz.
    fn output_sample_rate(&self) -> f64;

    /// Rate of the recorded channels, Hz.
    fn input_sample_rate(&self) -> f64;

    /// Play `left` and `right` together and record for their duration plus
    /// `post_duration_s`.
    ///
    /// # Errors
    ///
    /// [`Error::Hardware`] when the channels differ in length or were not
    /// synthesized at [`HardwareIo::output_sample_rate`], or when the device
    /// fails.
    fn play(&mut self, left: &Waveform, right: &Waveform, post_duration_s: f64) -> Result<Capture>;
}

/// Clip `samples` to ±`limit` in place, returning how many were changed.
pub fn clip_to(samples: &mut [f64], limit: f64) -> usize {
    let mut clipped = 0;
    for s in samples.iter_mut() {
        if s.abs() > limit {
            *s = s.signum() * limit;
            clipped += 1;
        }
    }
    clipped
}

/// Samples recorded for a stimulus of `output_len` samples.
pub fn capture_len(output_len: usize, output_rate: f64, input_rate: f64, post_duration_s: f64) -> usize {
    ((output_len as f64 / output_rate + post_duration_s.max(0.0)) * input_rate).ceil() as usize
}

/// Check and clip a stimulus pair the way an analog output stage would.
fn prepare_output(left: &Waveform, right: &Waveform, rate: f64) -> Result<(Vec<f64>, Vec<f64>, bool)> {
    if left.len() != right.len() {
        return Err(Error::Hardware(format!(
            "channel lengths differ: {} vs {} (L, R)",
            left.len(),
            right.len()
        )));
    }
    for w in [left, right] {
        if (w.sample_rate() - rate).abs() > 1e-9 * rate {
            return Err(Error::Hardware(format!(
                "stimulus at {} Hz, device plays at {rate} Hz",
                w.sample_rate()
            )));
        }
    }

    let mut l = left.samples().to_vec();
    let mut r = right.samples().to_vec();
    let n = clip_to(&mut l, OUTPUT_LIMIT_VOLTS) + clip_to(&mut r, OUTPUT_LIMIT_VOLTS);
    if n > 0 {
        tracing::warn!(samples = n, limit = OUTPUT_LIMIT_VOLTS, "stimulus clipped");
    }
    Ok((l, r, n > 0))
}

/// Parameters of the simulated animal and recording chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChamberSettings {
    /// Stimulus rate, Hz.
    pub output_sample_rate: f64,
    /// Recording rate, Hz.
    pub input_sample_rate: f64,
    /// Std of the transducer noise floor, volts.
    pub baseline_noise_v: f64,
    /// Peak of an uninhibited startle, volts.
    pub startle_amplitude_v: f64,
    /// Relative std of the trial-to-trial startle amplitude.
    pub amplitude_jitter: f64,
    /// Delay from startle stimulus onset to the motor response, ms.
    pub latency_ms: f64,
    /// Decay time constant of the response, ms.
    pub decay_ms: f64,
    /// Ringing frequency of the response, Hz.
    pub ring_hz: f64,
    /// Fraction of the response removed by a detected cue.
    pub inhibition: f64,
    /// Probability that a trial produces no startle at all.
    pub miss_probability: f64,
    /// How far before the startle the animal listens for a cue, ms.
    pub cue_window_ms: f64,
    /// Frame used to track the background level, ms.
    pub frame_ms: f64,
    /// Microphone volts per stimulus volt.
    pub microphone_gain: f64,
}

impl Default for ChamberSettings {
    fn default() -> Self {
        Self {
            output_sample_rate: 100_000.0,
            input_sample_rate: 24414.0625,
            baseline_noise_v: 0.005,
            startle_amplitude_v: 0.5,
            amplitude_jitter: 0.15,
            latency_ms: 8.0,
            decay_ms: 20.0,
            ring_hz: 120.0,
            inhibition: 0.6,
            miss_probability: 0.02,
            cue_window_ms: 150.0,
            frame_ms: 5.0,
            microphone_gain: 0.05,
        }
    }
}

/// Deterministic stand-in for the acquisition rig.
///
/// The startle onset is taken from the first sample where the right channel
/// reaches 5% of its peak. The animal "hears" a cue when any frame of the left
/// channel in the window before onset drops below half, or rises above twice,
/// the level of the preceding background; a cued startle is scaled by
/// `1 - inhibition`, and a small fraction of trials produce no startle at
/// all. Channel 2 is the acoustic mixture sampled at the input
/// rate.
///
/// # Example
///
/// ```rust
/// use startle_core::Waveform;
/// use startle_io::{HardwareIo, SimulatedChamber};
///
/// let mut chamber = SimulatedChamber::seeded(1);
/// let quiet = Waveform::silence(1000, chamber.output_sample_rate());
/// let capture = chamber.play(&quiet, &quiet, 0.35).unwrap();
/// assert_eq!(capture.len(), 8790); // (10 ms + 350 ms) at 24414.0625 Hz, rounded up
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedChamber {
    settings: ChamberSettings,
    noise: NoiseSource,
}

impl SimulatedChamber {
    /// Chamber with explicit settings.
    pub fn new(settings: ChamberSettings, seed: u64) -> Self {
        Self {
            settings,
            noise: NoiseSource::seeded(seed),
        }
    }

    /// Chamber with default settings.
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChamberSettings::default(), seed)
    }

    /// Current settings.
    pub fn settings(&self) -> &ChamberSettings {
        &self.settings
    }

    fn startle_onset(right: &[f64]) -> Option<usize> {
        let peak = right.iter().fold(0.0f64, |m, s| m.max(s.abs()));
        if peak <= 1e-9 {
            return None;
        }
        right.iter().position(|s| s.abs() >= 0.05 * peak)
    }

    fn cue_detected(&self, left: &[f64], onset: usize) -> bool {
        let sr = self.settings.output_sample_rate;
        let frame = ms_to_samples(self.settings.frame_ms, sr).max(1);
        let window = ms_to_samples(self.settings.cue_window_ms, sr);
        let onset = onset.min(left.len());
        let cue_start = onset.saturating_sub(window);
        let ref_start = cue_start.saturating_sub(window / 3);

        let frame_rms = |s: &[f64]| (s.iter().map(|x| x * x).sum::<f64>() / s.len().max(1) as f64).sqrt();
        let reference = frame_rms(&left[ref_start..cue_start]);
        let floor = 1e-6;

        left[cue_start..onset].chunks_exact(frame).any(|f| {
            let level = frame_rms(f);
            (reference > floor && level < 0.5 * reference) || level > 2.0 * reference + floor
        })
    }
}

impl HardwareIo for SimulatedChamber {
    fn name(&self) -> &str {
        "simulated chamber"
    }

    fn output_sample_rate(&self) -> f64 {
        self.settings.output_sample_rate
    }

    fn input_sample_rate(&self) -> f64 {
        self.settings.input_sample_rate
    }

    fn play(&mut self, left: &Waveform, right: &Waveform, post_duration_s: f64) -> Result<Capture> {
        let s = &self.settings;
        let out_sr = s.output_sample_rate;
        let in_sr = s.input_sample_rate;
        let (l, r, clipped) = prepare_output(left, right, out_sr)?;
        let n = capture_len(l.len(), out_sr, in_sr, post_duration_s);

        let mut channel1: Vec<f64> = self
            .noise
            .gaussian(n)
            .into_iter()
            .map(|v| v * s.baseline_noise_v)
            .collect();

        if let Some(onset) = Self::startle_onset(&r) {
            let cued = self.cue_detected(&l, onset);
            let s = &self.settings;
            let jitter = self.noise.gaussian(1)[0] * s.amplitude_jitter;
            let mut amplitude = s.startle_amplitude_v * (1.0 + jitter).max(0.0);
            if cued {
                amplitude *= 1.0 - s.inhibition;
            }
            if self.noise.rng_mut().gen_range(0.0..1.0) < s.miss_probability {
                amplitude = 0.0;
            }

            let t0 = onset as f64 / out_sr + s.latency_ms / 1000.0;
            let tau = s.decay_ms / 1000.0;
            let first = (t0 * in_sr).ceil() as usize;
            for (i, v) in channel1.iter_mut().enumerate().skip(first) {
                let t = i as f64 / in_sr - t0;
                *v += amplitude * (-t / tau).exp() * (2.0 * PI * s.ring_hz * t).sin();
            }
            tracing::debug!(onset, cued, amplitude, "simulated startle");
        }

        let s = &self.settings;
        let mic_noise = self.noise.gaussian(n);
        let channel2 = (0..n)
            .map(|i| {
                let j = (i as f64 * out_sr / in_sr) as usize;
                let acoustic = l.get(j).copied().unwrap_or(0.0) + r.get(j).copied().unwrap_or(0.0);
                acoustic * s.microphone_gain + mic_noise[i] * 0.1 * s.baseline_noise_v
            })
            .collect();

        Ok(Capture {
            channel1,
            channel2,
            sample_rate: in_sr,
            clipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burst(len: usize, start: usize, stop: usize, sr: f64) -> Waveform {
        let samples = (0..len)
            .map(|i| if (start..stop).contains(&i) { (i as f64 * 0.7).sin() } else { 0.0 })
            .collect();
        Waveform::new(samples, sr)
    }

    #[test]
    fn clip_counts_and_limits() {
        let mut x = [0.0, 12.0, -11.0, 9.9];
        assert_eq!(clip_to(&mut x, 10.0), 2);
        assert_eq!(x, [0.0, 10.0, -10.0, 9.9]);
    }

    #[test]
    fn capture_length_includes_post_period() {
        assert_eq!(capture_len(100_000, 100_000.0, 1000.0, 0.5), 1500);
        assert_eq!(capture_len(0, 100_000.0, 1000.0, 0.0), 0);
    }

    #[test]
    fn rejects_mismatched_channels() {
        let mut chamber = SimulatedChamber::seeded(1);
        let a = Waveform::silence(10, 100_000.0);
        let b = Waveform::silence(11, 100_000.0);
        assert!(matches!(chamber.play(&a, &b, 0.0), Err(Error::Hardware(_))));

        let c = Waveform::silence(10, 44_100.0);
        assert!(matches!(chamber.play(&c, &c, 0.0), Err(Error::Hardware(_))));
    }

    #[test]
    fn reports_clipping() {
        let mut chamber = SimulatedChamber::seeded(1);
        let loud = Waveform::new(vec![0.0, 25.0, 0.0], 100_000.0);
        let quiet = Waveform::silence(3, 100_000.0);
        assert!(chamber.play(&loud, &quiet, 0.0).unwrap().clipped);
        assert!(!chamber.play(&quiet, &quiet, 0.0).unwrap().clipped);
    }

    #[test]
    fn silence_gives_only_noise_floor() {
        let mut chamber = SimulatedChamber::seeded(3);
        let quiet = Waveform::silence(10_000, 100_000.0);
        let cap = chamber.play(&quiet, &quiet, 0.1).unwrap();
        let peak = cap.channel1.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(peak < 10.0 * chamber.settings().baseline_noise_v, "{peak}");
    }

    #[test]
    fn startle_follows_right_channel_onset() {
        let sr = 100_000.0;
        let mut chamber = SimulatedChamber::new(
            ChamberSettings {
                amplitude_jitter: 0.0,
                miss_probability: 0.0,
                ..ChamberSettings::default()
            },
            5,
        );
        let left = Waveform::silence(40_000, sr);
        let right = burst(40_000, 20_000, 22_000, sr);
        let cap = chamber.play(&left, &right, 0.2).unwrap();

        let in_sr = cap.sample_rate;
        let before = &cap.channel1[..(0.2 * in_sr) as usize];
        let after = &cap.channel1[(0.2 * in_sr) as usize..(0.3 * in_sr) as usize];
        let peak = |x: &[f64]| x.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(peak(after) > 5.0 * peak(before));
    }

    #[test]
    fn gap_before_startle_inhibits() {
        let sr = 100_000.0;
        let settings = ChamberSettings {
            amplitude_jitter: 0.0,
            miss_probability: 0.0,
            baseline_noise_v: 0.0,
            ..ChamberSettings::default()
        };
        let n = 40_000;
        let right = burst(n, 30_000, 32_000, sr);
        let steady = burst(n, 0, n, sr);
        let gapped = Waveform::new(
            steady
                .samples()
                .iter()
                .enumerate()
                .map(|(i, &v)| if (26_000..28_000).contains(&i) { 0.0 } else { v })
                .collect(),
            sr,
        );

        // Same seed, so any difference comes from the cue
        let open = SimulatedChamber::new(settings.clone(), 9).play(&steady, &right, 0.2).unwrap();
        let cued = SimulatedChamber::new(settings, 9).play(&gapped, &right, 0.2).unwrap();
        let peak = |x: &[f64]| x.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        let ratio = peak(&cued.channel1) / peak(&open.channel1);
        assert!((ratio - 0.4).abs() < 1e-6, "{ratio}");
    }

    #[test]
    fn microphone_hears_stimulus() {
        let sr = 100_000.0;
        let mut chamber = SimulatedChamber::seeded(2);
        let tone = burst(10_000, 0, 10_000, sr);
        let cap = chamber.play(&tone, &Waveform::silence(10_000, sr), 0.05).unwrap();
        let rms = |x: &[f64]| (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt();
        let sounding = &cap.channel2[..2000];
        let after = &cap.channel2[2500..];
        assert!(rms(sounding) > 20.0 * rms(after));
    }
}
