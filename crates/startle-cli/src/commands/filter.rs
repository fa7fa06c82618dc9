//! Response band-pass filter command.

use clap::Args;
use startle_analysis::{BandFilter, StopbandRule};
use startle_io::{WavSpec, read_wav, write_wav};
use std::path::PathBuf;

#[derive(Args)]
pub struct FilterArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Lower passband edge in Hz
    #[arg(long, default_value = "50.0")]
    highpass: f64,

    /// Upper passband edge in Hz
    #[arg(long, default_value = "1000.0")]
    lowpass: f64,
}

pub fn run(args: FilterArgs) -> anyhow::Result<()> {
    let (wave, _) = read_wav(&args.input)?;

    let filter = BandFilter::design(args.highpass, args.lowpass, wave.sample_rate(), StopbandRule::Wide)?;
    let edges = filter.edges();
    println!(
        "Elliptic band-pass, order {}: pass {:.1}-{:.1} Hz, stop {:.1}-{:.1} Hz",
        filter.order(),
        edges.passband[0],
        edges.passband[1],
        edges.stopband[0],
        edges.stopband[1]
    );

    let filtered = filter.apply(wave.samples());
    write_wav(&args.output, &filtered, WavSpec::float(1, wave.sample_rate()))?;

    println!("Wrote {} samples to {}", filtered.len(), args.output.display());
    Ok(())
}
