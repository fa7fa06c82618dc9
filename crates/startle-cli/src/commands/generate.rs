//! Stimulus generation command.

use clap::{Args, ValueEnum};
use startle_core::OutputChannel;
use startle_io::{WavSpec, write_wav};
use startle_synth::{StimulusSpec, Synthesizer, insert_gap};
use std::path::PathBuf;

/// Stimulus types for CLI
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum CliStimulus {
    #[default]
    Tone,
    Noise,
    Bandpass,
    Silence,
}

/// Output speaker for CLI
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum CliChannel {
    #[default]
    Conditioning,
    Startle,
}

impl From<CliChannel> for OutputChannel {
    fn from(c: CliChannel) -> Self {
        match c {
            CliChannel::Conditioning => OutputChannel::Conditioning,
            CliChannel::Startle => OutputChannel::Startle,
        }
    }
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Kind of stimulus
    #[arg(value_enum)]
    kind: CliStimulus,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Tone frequencies, or LOW,HIGH band edges for bandpass noise (Hz)
    #[arg(long, value_delimiter = ',')]
    freq: Vec<f64>,

    /// Level in dB SPL
    #[arg(long, default_value = "70.0")]
    level: f64,

    /// Speaker whose calibration sets the gain
    #[arg(long, value_enum, default_value = "conditioning")]
    channel: CliChannel,

    /// Burst duration in ms
    #[arg(long, default_value = "100.0")]
    duration: f64,

    /// Leading silence in ms
    #[arg(long, default_value = "0.0")]
    delay: f64,

    /// Rise/fall ramp in ms
    #[arg(long, default_value = "2.5")]
    rise_fall: f64,

    /// Number of bursts
    #[arg(long, default_value = "1")]
    pulses: usize,

    /// Interval between burst onsets in ms
    #[arg(long, default_value = "20.0")]
    ipi: f64,

    /// Keep every burst the same polarity
    #[arg(long)]
    no_alternate: bool,

    /// Start of a silent gap in ms
    #[arg(long, requires = "gap_duration")]
    gap_delay: Option<f64>,

    /// Length of the silent gap in ms
    #[arg(long, requires = "gap_delay")]
    gap_duration: Option<f64>,

    /// Sample rate in Hz
    #[arg(long, default_value = "100000")]
    sample_rate: u32,

    /// Noise seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let spec = match args.kind {
        CliStimulus::Tone => {
            if args.freq.is_empty() {
                StimulusSpec::tone(&[1000.0])
            } else {
                StimulusSpec::tone(&args.freq)
            }
        }
        CliStimulus::Noise => StimulusSpec::broadband_noise(),
        CliStimulus::Bandpass => match args.freq.as_slice() {
            [] => StimulusSpec::bandpass_noise(1000.0, 32000.0),
            [low, high] => StimulusSpec::bandpass_noise(*low, *high),
            _ => anyhow::bail!("Bandpass noise needs --freq LOW,HIGH"),
        },
        CliStimulus::Silence => StimulusSpec::silence(),
    };
    let spec = spec
        .with_sample_rate(f64::from(args.sample_rate))
        .with_duration(args.duration)
        .with_delay(args.delay)
        .with_rise_fall(args.rise_fall)
        .with_pulses(args.pulses, args.ipi)
        .with_alternate(!args.no_alternate)
        .with_level(args.level, args.channel.into());

    println!(
        "Generating {} ({:.1} dB, {} ms x {} at {} Hz)...",
        spec.mode, spec.level_db, spec.duration_ms, spec.pulses, args.sample_rate
    );

    let mut synth = match args.seed {
        Some(seed) => Synthesizer::seeded(seed),
        None => Synthesizer::default(),
    };
    let mut wave = synth.synthesize(&spec)?;

    if let (Some(delay), Some(duration)) = (args.gap_delay, args.gap_duration) {
        println!("Cutting {duration} ms gap at {delay} ms");
        wave = insert_gap(&wave, delay, duration, args.rise_fall);
    }

    write_wav(&args.output, wave.samples(), WavSpec::float(1, wave.sample_rate()))?;

    println!(
        "Wrote {} samples ({:.1} ms, peak {:.4} V) to {}",
        wave.len(),
        wave.duration_ms(),
        wave.peak(),
        args.output.display()
    );

    Ok(())
}
