//! Power spectrum command.

use clap::Args;
use startle_analysis::power_spectrum;
use startle_io::read_wav;
use std::path::PathBuf;

#[derive(Args)]
pub struct SpectrumArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Number of peaks to report
    #[arg(long, default_value = "5")]
    peaks: usize,

    /// Write the full spectrum as CSV
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: SpectrumArgs) -> anyhow::Result<()> {
    let (wave, spec) = read_wav(&args.input)?;

    println!("Analyzing {}...", args.input.display());
    println!(
        "  {} samples, {} Hz, {} channel(s)",
        wave.len(),
        spec.sample_rate,
        spec.channels
    );

    let spectrum = power_spectrum(wave.samples(), wave.sample_rate())?;
    println!("  FFT size: {}", spectrum.fft_size);
    println!("  Resolution: {:.3} Hz", spectrum.bin_width());

    if let Some(peak) = spectrum.peak_frequency() {
        println!("  Peak: {:.1} Hz", peak);
    }

    let peaks = spectrum.peaks(args.peaks);
    if !peaks.is_empty() {
        println!("\nPeaks:");
        for (i, (freq, power)) in peaks.iter().enumerate() {
            println!(
                "  {:2}. {:10.1} Hz  {:8.1} dB",
                i + 1,
                freq,
                10.0 * power.max(1e-30).log10()
            );
        }
    }

    if let Some(output) = &args.output {
        let mut csv = String::from("frequency_hz,power,power_db\n");
        for ((f, p), db) in spectrum
            .frequencies
            .iter()
            .zip(&spectrum.power)
            .zip(spectrum.power_db())
        {
            csv.push_str(&format!("{},{},{}\n", f, p, db));
        }
        std::fs::write(output, csv)?;
        println!("\nSpectrum saved to {}", output.display());
    }

    Ok(())
}
