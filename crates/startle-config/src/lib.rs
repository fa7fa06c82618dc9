//! Experiment parameter files for acoustic startle runs.
//!
//! # Features
//!
//! - **TOML configuration**: [`ExperimentConfig`] with defaulted sections for
//!   the background, gap/prepulse, startle, trials, analysis, hardware, and
//!   calibration
//! - **Legacy INI**: import and export of parameter files written by older
//!   acquisition software
//! - **Validation**: every duration, level, and band edge checked at once
//! - **Paths**: platform-specific config and recording locations
//!
//! # Example
//!
//! ```rust,no_run
//! use startle_config::{ExperimentConfig, paths};
//!
//! let mut config = ExperimentConfig::new("gap detection");
//! config.trials.count = 20;
//! config.trials.habituation = 4;
//! config.validate().unwrap();
//! config.save(paths::default_config_path()).unwrap();
//!
//! let legacy = ExperimentConfig::load_legacy_ini("old_run.ini").unwrap();
//! println!("{}", legacy.to_toml().unwrap());
//! ```

mod error;
mod experiment;
mod ini;

/// Platform-specific paths for configuration and recordings.
pub mod paths;

/// Experiment parameter validation.
pub mod validation;

pub use error::ConfigError;
pub use experiment::{
    Analysis, CalibrationConfig, Conditioning, ExperimentConfig, Flags, Hardware, LegacyFields,
    Prepulse, Startle, Trials,
};
pub use ini::{mode_from_code, mode_to_code};
pub use validation::{MAX_LEVEL_DB, ValidationError, ValidationResult, validate_experiment};
