//! Experiment configuration commands.
//!
//! Create, inspect, and convert parameter files between TOML and the legacy
//! INI layout.

use clap::{Args, Subcommand};
use startle_config::{ExperimentConfig, paths};
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write a configuration with default values
    Init {
        /// Destination (default: the user configuration file)
        path: Option<PathBuf>,

        /// Experiment name
        #[arg(short, long, default_value = "default")]
        name: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration and print it as TOML
    Show {
        /// Configuration file (default: the user configuration file)
        path: Option<PathBuf>,
    },

    /// Convert a legacy INI parameter file to TOML
    ImportIni {
        /// Legacy INI file
        input: PathBuf,

        /// TOML destination (default: INPUT with a .toml extension)
        output: Option<PathBuf>,
    },

    /// Convert a TOML configuration to a legacy INI parameter file
    ExportIni {
        /// TOML configuration
        input: PathBuf,

        /// INI destination
        output: PathBuf,
    },

    /// Show configuration and recording directories
    Paths,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Init { path, name, force } => {
            let path = path.unwrap_or_else(paths::default_config_path);
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists. Use --force to overwrite.",
                    path.display()
                );
            }
            let config = ExperimentConfig::new(name);
            config.save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }

        ConfigCommand::Show { path } => {
            let path = path.unwrap_or_else(paths::default_config_path);
            let config = ExperimentConfig::load(&path)?;
            match config.validate() {
                Ok(()) => eprintln!("# {}: valid", path.display()),
                Err(e) => eprintln!("# {}: {}", path.display(), e),
            }
            print!("{}", config.to_toml()?);
        }

        ConfigCommand::ImportIni { input, output } => {
            let config = ExperimentConfig::load_legacy_ini(&input)?;
            if let Err(e) = config.validate() {
                println!("Warning: {}", e);
            }
            let output = output.unwrap_or_else(|| input.with_extension("toml"));
            config.save(&output)?;
            println!("Imported {} -> {}", input.display(), output.display());
        }

        ConfigCommand::ExportIni { input, output } => {
            let config = ExperimentConfig::load(&input)?;
            config.save_legacy_ini(&output)?;
            println!("Exported {} -> {}", input.display(), output.display());
        }

        ConfigCommand::Paths => {
            println!("Configuration: {}", paths::default_config_path().display());
            println!("Recordings:    {}", paths::recordings_dir().display());
        }
    }

    Ok(())
}
