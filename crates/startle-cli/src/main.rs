//! Startle CLI - stimulus generation, simulated runs, and recording analysis.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "startle")]
#[command(author, version, about = "Acoustic startle experiment toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a calibrated stimulus to a WAV file
    Generate(commands::generate::GenerateArgs),

    /// Print the power spectrum of a WAV file
    Spectrum(commands::spectrum::SpectrumArgs),

    /// Band-pass filter a WAV file with the response filter
    Filter(commands::filter::FilterArgs),

    /// Run an experiment against the simulated chamber
    Run(commands::run::RunArgs),

    /// Re-analyze a recording file
    Analyze(commands::analyze::AnalyzeArgs),

    /// Create, show, and convert experiment parameter files
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => commands::generate::run(args),
        Commands::Spectrum(args) => commands::spectrum::run(args),
        Commands::Filter(args) => commands::filter::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
