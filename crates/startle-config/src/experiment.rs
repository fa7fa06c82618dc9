//! Experiment parameter set and its TOML file format.

use serde::{Deserialize, Serialize};
use std::path::Path;

use startle_analysis::AnalysisSettings;
use startle_core::Calibration;
use startle_synth::{PlanSettings, StimulusMode, TrialLayout};

use crate::error::ConfigError;

/// Complete parameter set for one experiment run.
///
/// Every section is defaulted, so a file only needs the values it changes.
///
/// # TOML Format
///
/// ```toml
/// name = "gap detection, 60 dB background"
///
/// [conditioning]
/// mode = "bandpass-noise"
/// level_db = 60.0
/// duration_ms = 200.0
///
/// [prepulse]
/// mode = "silence"
/// duration_ms = 20.0
/// highpass_hz = 4000.0
/// lowpass_hz = 16000.0
///
/// [startle]
/// level_db = 105.0
///
/// [trials]
/// count = 20
/// habituation = 4
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Name shown in reports and recording headers.
    pub name: String,
    /// Optional free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display and recording switches.
    pub flags: Flags,
    /// Background sound.
    pub conditioning: Conditioning,
    /// Gap / prepulse window.
    pub prepulse: Prepulse,
    /// Startle burst.
    pub startle: Startle,
    /// Trial counts and timing.
    pub trials: Trials,
    /// Offline and online response analysis.
    pub analysis: Analysis,
    /// Sample rates and recording length.
    pub hardware: Hardware,
    /// Speaker calibration.
    pub calibration: CalibrationConfig,
    /// Values carried through from legacy parameter files.
    #[serde(skip_serializing_if = "LegacyFields::is_default")]
    pub legacy: LegacyFields,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: "Untitled".to_string(),
            description: None,
            flags: Flags::default(),
            conditioning: Conditioning::default(),
            prepulse: Prepulse::default(),
            startle: Startle::default(),
            trials: Trials::default(),
            analysis: Analysis::default(),
            hardware: Hardware::default(),
            calibration: CalibrationConfig::default(),
            legacy: LegacyFields::default(),
        }
    }
}

/// Display and recording switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Flags {
    /// Present stimuli; when off, trials run silently.
    pub stim_enable: bool,
    /// Plot every trial's waveforms.
    pub wave_plot: bool,
    /// Show spectra alongside waveforms.
    pub show_spectrum: bool,
    /// Append every trial to a recording file.
    pub auto_save: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            stim_enable: true,
            wave_plot: true,
            show_spectrum: false,
            auto_save: true,
        }
    }
}

/// Background (conditioning) sound.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Conditioning {
    /// Sound played under the whole trial.
    pub mode: StimulusMode,
    /// Level, dB SPL.
    pub level_db: f64,
    /// Mean duration before the gap/prepulse window, ms.
    pub duration_ms: f64,
    /// Full width of the per-trial duration jitter, ms.
    pub variation_ms: f64,
}

impl Default for Conditioning {
    fn default() -> Self {
        Self {
            mode: StimulusMode::BandpassNoise,
            level_db: 70.0,
            duration_ms: 200.0,
            variation_ms: 0.0,
        }
    }
}

/// Gap / prepulse window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Prepulse {
    /// Sound in the window on gap trials; silence makes it a pure gap.
    pub mode: StimulusMode,
    /// Prepulse level, dB SPL.
    pub level_db: f64,
    /// Level of the background inside the gap, dB SPL (recorded, not synthesized).
    pub off_level_db: f64,
    /// Window length, ms.
    pub duration_ms: f64,
    /// Tone frequency, Hz.
    pub frequency_hz: f64,
    /// Lower band edge for band-limited sounds, Hz.
    pub highpass_hz: f64,
    /// Upper band edge for band-limited sounds, Hz.
    pub lowpass_hz: f64,
    /// Cut a gap in the background even when a prepulse sound plays.
    pub gap: bool,
}

impl Default for Prepulse {
    fn default() -> Self {
        Self {
            mode: StimulusMode::Silence,
            level_db: 70.0,
            off_level_db: 0.0,
            duration_ms: 20.0,
            frequency_hz: 4000.0,
            highpass_hz: 4000.0,
            lowpass_hz: 16000.0,
            gap: true,
        }
    }
}

/// Startle burst.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Startle {
    /// Interval between the gap/prepulse window and the startle, ms.
    pub pre_duration_ms: f64,
    /// Burst length, ms.
    pub duration_ms: f64,
    /// Level, dB SPL on the startle speaker.
    pub level_db: f64,
    /// Lower band edge of the startle noise, Hz.
    pub band_low_hz: f64,
    /// Upper band edge of the startle noise, Hz.
    pub band_high_hz: f64,
}

impl Default for Startle {
    fn default() -> Self {
        Self {
            pre_duration_ms: 100.0,
            duration_ms: 20.0,
            level_db: 100.0,
            band_low_hz: 1000.0,
            band_high_hz: 32000.0,
        }
    }
}

/// Trial counts and timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Trials {
    /// Test trials, half of them gap trials.
    pub count: usize,
    /// Leading no-gap trials excluded from analysis.
    pub habituation: usize,
    /// Mean inter-trial interval, s.
    pub iti_s: f64,
    /// Full width of the ITI jitter, s.
    pub iti_variation_s: f64,
}

impl Default for Trials {
    fn default() -> Self {
        Self {
            count: 10,
            habituation: 0,
            iti_s: 20.0,
            iti_variation_s: 5.0,
        }
    }
}

/// Response analysis window, filter, and rejection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Analysis {
    /// Window start relative to startle onset, ms.
    pub start_ms: f64,
    /// Window length, ms.
    pub duration_ms: f64,
    /// Lower edge of the response band, Hz.
    pub highpass_hz: f64,
    /// Upper edge of the response band, Hz.
    pub lowpass_hz: f64,
    /// Baseline length at the window start, ms.
    pub baseline_ms: f64,
    /// Baseline rejection multiple.
    pub baseline_std_factor: f64,
    /// Upper window rejection multiple.
    pub waveform_std_factor: f64,
    /// Lower window rejection multiple.
    pub waveform_min_std_factor: f64,
    /// Trials the experimenter marked for exclusion.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excluded_trials: Vec<usize>,
}

impl Default for Analysis {
    fn default() -> Self {
        let s = AnalysisSettings::default();
        Self {
            start_ms: s.start_ms,
            duration_ms: s.duration_ms,
            highpass_hz: s.highpass_hz,
            lowpass_hz: s.lowpass_hz,
            baseline_ms: s.baseline_ms,
            baseline_std_factor: s.baseline_std_factor,
            waveform_std_factor: s.waveform_std_factor,
            waveform_min_std_factor: s.waveform_min_std_factor,
            excluded_trials: Vec::new(),
        }
    }
}

/// Acquisition parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Hardware {
    /// Output (speaker) sample rate, Hz.
    pub output_sample_rate: f64,
    /// Input (response) sample rate, Hz.
    pub input_sample_rate: f64,
    /// Recording continues this long after the stimulus ends, s.
    pub post_duration_s: f64,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            output_sample_rate: 100_000.0,
            input_sample_rate: 24414.0625,
            post_duration_s: 0.35,
        }
    }
}

/// Speaker calibration point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Drive voltage the reference levels were measured at.
    pub reference_volts: f64,
    /// Conditioning speaker level at `reference_volts`, dB SPL.
    pub conditioning_reference_db: f64,
    /// Startle speaker level at `reference_volts`, dB SPL.
    pub startle_reference_db: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        let c = Calibration::default();
        Self {
            reference_volts: c.reference_volts,
            conditioning_reference_db: c.conditioning_reference_db,
            startle_reference_db: c.startle_reference_db,
        }
    }
}

/// Legacy fields with no effect on synthesis, kept so an imported parameter
/// file exports unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LegacyFields {
    /// Date string from the `[State]` section.
    pub date: String,
    /// Selected tab index from the `[State]` section.
    pub current_tab: i64,
    /// Notch edges for notched-noise prepulses, Hz.
    pub notch_hz: [f64; 2],
    /// Free-text multi-frequency list.
    pub multi_freq: String,
}

impl LegacyFields {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl ExperimentConfig {
    /// Create a default configuration with a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), name = %config.name, "experiment config loaded");
        Ok(config)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Trial plan parameters.
    pub fn plan_settings(&self) -> PlanSettings {
        PlanSettings {
            count: self.trials.count,
            habituation: self.trials.habituation,
            iti_s: self.trials.iti_s,
            iti_variation_s: self.trials.iti_variation_s,
            conditioning_ms: self.conditioning.duration_ms,
            conditioning_variation_ms: self.conditioning.variation_ms,
        }
    }

    /// Per-trial stimulus layout at the output sample rate.
    pub fn trial_layout(&self) -> TrialLayout {
        TrialLayout {
            conditioning_mode: self.conditioning.mode,
            conditioning_level_db: self.conditioning.level_db,
            prepulse_mode: self.prepulse.mode,
            prepulse_level_db: self.prepulse.level_db,
            prepulse_ms: self.prepulse.duration_ms,
            gap: self.prepulse.gap,
            tone_hz: self.prepulse.frequency_hz,
            band_hz: [self.prepulse.highpass_hz, self.prepulse.lowpass_hz],
            prestartle_ms: self.startle.pre_duration_ms,
            startle_ms: self.startle.duration_ms,
            startle_level_db: self.startle.level_db,
            startle_band_hz: [self.startle.band_low_hz, self.startle.band_high_hz],
            sample_rate: self.hardware.output_sample_rate,
        }
    }

    /// Offline analysis settings, including the habituation count.
    pub fn analysis_settings(&self) -> AnalysisSettings {
        let a = &self.analysis;
        AnalysisSettings {
            start_ms: a.start_ms,
            duration_ms: a.duration_ms,
            highpass_hz: a.highpass_hz,
            lowpass_hz: a.lowpass_hz,
            baseline_ms: a.baseline_ms,
            baseline_std_factor: a.baseline_std_factor,
            waveform_std_factor: a.waveform_std_factor,
            waveform_min_std_factor: a.waveform_min_std_factor,
            habituation: self.trials.habituation,
            excluded_trials: a.excluded_trials.clone(),
        }
    }

    /// Level calibration.
    pub fn calibration(&self) -> Calibration {
        Calibration {
            reference_volts: self.calibration.reference_volts,
            conditioning_reference_db: self.calibration.conditioning_reference_db,
            startle_reference_db: self.calibration.startle_reference_db,
        }
    }

    /// Startle onset for a trial with the given conditioning duration, ms.
    pub fn startle_onset_ms(&self, conditioning_ms: f64) -> f64 {
        conditioning_ms + self.prepulse.duration_ms + self.startle.pre_duration_ms
    }

    /// Check every value; see [`crate::validate_experiment`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        crate::validation::validate_experiment(self)?;
        Ok(())
    }
}
