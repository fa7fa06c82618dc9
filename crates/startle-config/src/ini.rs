//! Legacy INI parameter files.
//!
//! Older acquisition software stored its parameters as INI text with the
//! sections `[State]`, `[Flags]`, `[Conditioning]`, `[Prepulse]`, `[Trials]`
//! and `[Startle]`. Waveform modes are integer codes:
//!
//! | Code | Mode |
//! |------|------|
//! | 0 | silence |
//! | 1, 4, 5 | tone |
//! | 2, 6 | bandpass noise |
//! | 3 | notched noise (never implemented, imported as silence) |
//! | 7 | broadband noise |
//!
//! Option names are matched case-insensitively. Missing options keep their
//! defaults; options that are present but unparseable are errors.

use std::fmt::Write as _;
use std::path::Path;

use startle_synth::StimulusMode;

use crate::error::ConfigError;
use crate::experiment::ExperimentConfig;

/// Map a legacy waveform code to a mode.
pub fn mode_from_code(code: i64) -> Option<StimulusMode> {
    match code {
        0 => Some(StimulusMode::Silence),
        1 | 4 | 5 => Some(StimulusMode::Tone),
        2 | 6 => Some(StimulusMode::BandpassNoise),
        3 => {
            tracing::warn!("notched noise is not supported, using silence");
            Some(StimulusMode::Silence)
        }
        7 => Some(StimulusMode::BroadbandNoise),
        _ => None,
    }
}

/// Legacy waveform code for a mode.
pub fn mode_to_code(mode: StimulusMode) -> i64 {
    match mode {
        StimulusMode::Silence => 0,
        StimulusMode::Tone => 1,
        StimulusMode::BandpassNoise => 2,
        StimulusMode::BroadbandNoise => 7,
    }
}

struct Entry {
    line: usize,
    section: String,
    key: String,
    value: String,
}

/// Parsed INI text: `(section, option) → value`, remembering line numbers.
struct IniDocument {
    entries: Vec<Entry>,
}

impl IniDocument {
    fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut entries = Vec::new();
        let mut section: Option<String> = None;

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| ConfigError::legacy_ini(line, "unterminated section header"))?;
                section = Some(name.trim().to_string());
                continue;
            }
            let Some(current) = &section else {
                return Err(ConfigError::legacy_ini(line, "option before any section header"));
            };
            let split = trimmed
                .find(['=', ':'])
                .ok_or_else(|| ConfigError::legacy_ini(line, format!("expected 'key = value', got '{trimmed}'")))?;
            entries.push(Entry {
                line,
                section: current.clone(),
                key: trimmed[..split].trim().to_lowercase(),
                value: trimmed[split + 1..].trim().to_string(),
            });
        }
        Ok(Self { entries })
    }

    fn get(&self, section: &str, key: &str) -> Option<&Entry> {
        let key = key.to_lowercase();
        // Later duplicates win
        self.entries.iter().rev().find(|e| e.section == section && e.key == key)
    }

    fn string(&self, section: &str, key: &str, out: &mut String) {
        if let Some(e) = self.get(section, key) {
            out.clone_from(&e.value);
        }
    }

    fn float(&self, section: &str, key: &str, out: &mut f64) -> Result<(), ConfigError> {
        if let Some(e) = self.get(section, key) {
            *out = e.value.parse().map_err(|_| {
                ConfigError::legacy_ini(e.line, format!("'{}' is not a number for {key}", e.value))
            })?;
        }
        Ok(())
    }

    fn int(&self, section: &str, key: &str) -> Result<Option<i64>, ConfigError> {
        self.get(section, key)
            .map(|e| {
                // Counts were sometimes written as floats
                e.value
                    .parse::<i64>()
                    .or_else(|_| e.value.parse::<f64>().map(|v| v as i64))
                    .map_err(|_| {
                        ConfigError::legacy_ini(e.line, format!("'{}' is not an integer for {key}", e.value))
                    })
            })
            .transpose()
    }

    fn count(&self, section: &str, key: &str, out: &mut usize) -> Result<(), ConfigError> {
        if let Some(v) = self.int(section, key)? {
            *out = usize::try_from(v).map_err(|_| {
                let line = self.get(section, key).map_or(0, |e| e.line);
                ConfigError::legacy_ini(line, format!("{key} must not be negative"))
            })?;
        }
        Ok(())
    }

    fn boolean(&self, section: &str, key: &str, out: &mut bool) -> Result<(), ConfigError> {
        if let Some(e) = self.get(section, key) {
            *out = match e.value.to_lowercase().as_str() {
                "1" | "yes" | "true" | "on" => true,
                "0" | "no" | "false" | "off" => false,
                _ => {
                    return Err(ConfigError::legacy_ini(
                        e.line,
                        format!("'{}' is not a boolean for {key}", e.value),
                    ));
                }
            };
        }
        Ok(())
    }

    fn mode(&self, section: &str, key: &str, out: &mut StimulusMode) -> Result<(), ConfigError> {
        if let Some(code) = self.int(section, key)? {
            *out = mode_from_code(code).ok_or_else(|| {
                let line = self.get(section, key).map_or(0, |e| e.line);
                ConfigError::legacy_ini(line, format!("unknown waveform code {code} for {key}"))
            })?;
        }
        Ok(())
    }
}

fn py_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

impl ExperimentConfig {
    /// Import a legacy INI parameter file from text.
    ///
    /// Sections and options the legacy format lacks (analysis, hardware,
    /// calibration, prestartle interval, band edges of the startle) keep
    /// their defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use startle_config::ExperimentConfig;
    /// use startle_synth::StimulusMode;
    ///
    /// let ini = "[Conditioning]\nCN_Level = 65.0\nCN_Mode = 1\n\n[Trials]\nNTrials = 12\n";
    /// let config = ExperimentConfig::from_legacy_ini(ini).unwrap();
    /// assert_eq!(config.conditioning.level_db, 65.0);
    /// assert_eq!(config.conditioning.mode, StimulusMode::Tone);
    /// assert_eq!(config.trials.count, 12);
    /// ```
    pub fn from_legacy_ini(text: &str) -> Result<Self, ConfigError> {
        let doc = IniDocument::parse(text)?;
        let mut c = ExperimentConfig::default();

        doc.string("State", "Date", &mut c.legacy.date);
        if let Some(tab) = doc.int("State", "currenttab")? {
            c.legacy.current_tab = tab;
        }

        doc.boolean("Flags", "stimEnable", &mut c.flags.stim_enable)?;
        doc.boolean("Flags", "WavePlot", &mut c.flags.wave_plot)?;
        doc.boolean("Flags", "ShowSpectrum", &mut c.flags.show_spectrum)?;

        doc.float("Conditioning", "CN_Level", &mut c.conditioning.level_db)?;
        doc.float("Conditioning", "CN_Dur", &mut c.conditioning.duration_ms)?;
        doc.float("Conditioning", "CN_Var", &mut c.conditioning.variation_ms)?;
        doc.mode("Conditioning", "CN_Mode", &mut c.conditioning.mode)?;

        doc.float("Prepulse", "PP_Level", &mut c.prepulse.level_db)?;
        doc.float("Prepulse", "PP_OffLevel", &mut c.prepulse.off_level_db)?;
        doc.float("Prepulse", "PP_Dur", &mut c.prepulse.duration_ms)?;
        doc.mode("Prepulse", "PP_Mode", &mut c.prepulse.mode)?;
        doc.float("Prepulse", "PP_Freq", &mut c.prepulse.frequency_hz)?;
        doc.float("Prepulse", "PP_HP", &mut c.prepulse.highpass_hz)?;
        doc.float("Prepulse", "PP_LP", &mut c.prepulse.lowpass_hz)?;
        doc.float("Prepulse", "PP_Notch_F1", &mut c.legacy.notch_hz[0])?;
        doc.float("Prepulse", "PP_Notch_F2", &mut c.legacy.notch_hz[1])?;
        doc.string("Prepulse", "PP_MultiFreq", &mut c.legacy.multi_freq);
        doc.boolean("Prepulse", "PP_GapFlag", &mut c.prepulse.gap)?;

        doc.float("Trials", "ITI", &mut c.trials.iti_s)?;
        doc.float("Trials", "Var", &mut c.trials.iti_variation_s)?;
        doc.count("Trials", "NTrials", &mut c.trials.count)?;
        doc.count("Trials", "NHabTrials", &mut c.trials.habituation)?;

        doc.float("Startle", "Dur", &mut c.startle.duration_ms)?;
        doc.float("Startle", "Level", &mut c.startle.level_db)?;

        tracing::debug!(options = doc.entries.len(), "legacy parameter file imported");
        Ok(c)
    }

    /// Import a legacy INI parameter file from disk.
    pub fn load_legacy_ini(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let mut config = Self::from_legacy_ini(&text)?;
        if let Some(stem) = path.file_stem() {
            config.name = stem.to_string_lossy().into_owned();
        }
        Ok(config)
    }

    /// Export as legacy INI text.
    ///
    /// The `[State]` date is the imported one, or today's date when the
    /// configuration did not come from a legacy file.
    pub fn to_legacy_ini(&self) -> String {
        let date = if self.legacy.date.is_empty() {
            chrono::Local::now().format("%d-%b-%Y").to_string()
        } else {
            self.legacy.date.clone()
        };

        let mut out = String::new();
        let mut section = |name: &str, options: &[(&str, String)]| {
            let _ = writeln!(out, "[{name}]");
            for (key, value) in options {
                let _ = writeln!(out, "{key} = {value}");
            }
            out.push('\n');
        };

        section(
            "State",
            &[
                ("currenttab", self.legacy.current_tab.to_string()),
                ("Date", date),
            ],
        );
        section(
            "Flags",
            &[
                ("stimEnable", py_bool(self.flags.stim_enable).to_string()),
                ("WavePlot", py_bool(self.flags.wave_plot).to_string()),
                ("ShowSpectrum", py_bool(self.flags.show_spectrum).to_string()),
            ],
        );
        let cn = &self.conditioning;
        section(
            "Conditioning",
            &[
                ("CN_Level", format!("{:?}", cn.level_db)),
                ("CN_Dur", format!("{:?}", cn.duration_ms)),
                ("CN_Var", format!("{:?}", cn.variation_ms)),
                ("CN_Mode", mode_to_code(cn.mode).to_string()),
            ],
        );
        let pp = &self.prepulse;
        section(
            "Prepulse",
            &[
                ("PP_Level", format!("{:?}", pp.level_db)),
                ("PP_OffLevel", format!("{:?}", pp.off_level_db)),
                ("PP_Dur", format!("{:?}", pp.duration_ms)),
                ("PP_Mode", mode_to_code(pp.mode).to_string()),
                ("PP_Freq", format!("{:?}", pp.frequency_hz)),
                ("PP_HP", format!("{:?}", pp.highpass_hz)),
                ("PP_LP", format!("{:?}", pp.lowpass_hz)),
                ("PP_Notch_F1", format!("{:?}", self.legacy.notch_hz[0])),
                ("PP_Notch_F2", format!("{:?}", self.legacy.notch_hz[1])),
                ("PP_MultiFreq", self.legacy.multi_freq.clone()),
                ("PP_GapFlag", py_bool(pp.gap).to_string()),
            ],
        );
        let tr = &self.trials;
        section(
            "Trials",
            &[
                ("ITI", format!("{:?}", tr.iti_s)),
                ("Var", format!("{:?}", tr.iti_variation_s)),
                ("NTrials", tr.count.to_string()),
                ("NHabTrials", tr.habituation.to_string()),
            ],
        );
        section(
            "Startle",
            &[
                ("Dur", format!("{:?}", self.startle.duration_ms)),
                ("Level", format!("{:?}", self.startle.level_db)),
            ],
        );
        out
    }

    /// Export as a legacy INI file.
    pub fn save_legacy_ini(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_legacy_ini()).map_err(|e| ConfigError::write_file(path, e))
    }
}
