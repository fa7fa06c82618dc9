//! WAV file reading and writing.
//!
//! Stimuli are stored in volts, so 32-bit float files keep them unscaled.
//! Integer files clamp to ±1.0 full scale.

use crate::Result;
use hound::{SampleFormat, WavReader, WavWriter};
use startle_core::Waveform;
use std::path::Path;

/// WAV file specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample (16, 24, or 32 for float).
    pub bits_per_sample: u16,
}

impl WavSpec {
    /// Float spec for `channels` at `sample_rate` Hz, rounded to whole Hz.
    pub fn float(channels: u16, sample_rate: f64) -> Self {
        Self {
            channels,
            sample_rate: sample_rate.round() as u32,
            bits_per_sample: 32,
        }
    }
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: 100_000,
            bits_per_sample: 32,
        }
    }
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// Read a WAV file into a [`Waveform`].
///
/// Multi-channel files are mixed down to mono by averaging channels.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Waveform, WavSpec)> {
    let reader = WavReader::open(path)?;
    let format = reader.spec().sample_format;
    let spec = WavSpec::from(reader.spec());
    let channels = usize::from(spec.channels.max(1));

    let samples: Vec<f64> = match format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = f64::from(1i32 << (spec.bits_per_sample - 1));
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| f64::from(v) / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let mono = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f64>() / channels as f64)
            .collect()
    } else {
        samples
    };

    tracing::debug!(
        frames = mono.len(),
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        "read wav"
    );
    Ok((Waveform::new(mono, f64::from(spec.sample_rate)), spec))
}

/// Write mono samples to a WAV file.
///
/// # Example
///
/// ```ignore
/// let tone = synth.synthesize(&StimulusSpec::tone(vec![4000.0]))?;
/// write_wav("tone.wav", tone.samples(), WavSpec::float(1, tone.sample_rate()))?;
/// ```
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f64], spec: WavSpec) -> Result<()> {
    let mut writer = WavWriter::create(path, hound::WavSpec::from(spec))?;
    write_frames(&mut writer, samples.iter().copied(), spec)?;
    writer.finalize()?;
    Ok(())
}

/// Write two channels to an interleaved stereo WAV file.
///
/// The shorter channel is padded with silence. `spec.channels` is forced to 2.
pub fn write_wav_stereo<P: AsRef<Path>>(
    path: P,
    left: &[f64],
    right: &[f64],
    spec: WavSpec,
) -> Result<()> {
    let spec = WavSpec { channels: 2, ..spec };
    let frames = left.len().max(right.len());
    let interleaved = (0..frames).flat_map(|i| {
        [
            left.get(i).copied().unwrap_or(0.0),
            right.get(i).copied().unwrap_or(0.0),
        ]
    });

    let mut writer = WavWriter::create(path, hound::WavSpec::from(spec))?;
    write_frames(&mut writer, interleaved, spec)?;
    writer.finalize()?;
    Ok(())
}

fn write_frames<W, I>(writer: &mut WavWriter<W>, samples: I, spec: WavSpec) -> Result<()>
where
    W: std::io::Write + std::io::Seek,
    I: Iterator<Item = f64>,
{
    if spec.bits_per_sample == 32 {
        for sample in samples {
            writer.write_sample(sample as f32)?;
        }
    } else {
        let max_val = f64::from(1i32 << (spec.bits_per_sample - 1));
        for sample in samples {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }
    Ok(())
}
