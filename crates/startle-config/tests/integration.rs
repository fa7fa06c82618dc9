//! Integration tests for startle-config.
//!
//! File round-trips through a temporary directory, and the hand-off from a
//! loaded configuration to the synthesis and analysis crates.

use startle_config::{ConfigError, ExperimentConfig, ValidationError};
use startle_synth::{StimulusMode, Synthesizer, TrialComposer};
use tempfile::TempDir;

#[test]
fn save_and_load_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("run.toml");

    let mut config = ExperimentConfig::new("file roundtrip");
    config.conditioning.mode = StimulusMode::Tone;
    config.trials.count = 30;
    config.save(&path).unwrap();

    let loaded = ExperimentConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn load_missing_file_names_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let err = ExperimentConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn legacy_file_roundtrip_and_name() {
    let dir = TempDir::new().unwrap();
    let ini = dir.path().join("mouse7.ini");
    std::fs::write(
        &ini,
        "[Conditioning]\nCN_Mode = 1\nCN_Level = 55.0\n[Trials]\nNTrials = 8\nNHabTrials = 2\n",
    )
    .unwrap();

    let config = ExperimentConfig::load_legacy_ini(&ini).unwrap();
    assert_eq!(config.name, "mouse7");
    assert_eq!(config.conditioning.mode, StimulusMode::Tone);

    let out = dir.path().join("export.ini");
    config.save_legacy_ini(&out).unwrap();
    let back = ExperimentConfig::load_legacy_ini(&out).unwrap();
    assert_eq!(back.conditioning, config.conditioning);
    assert_eq!(back.trials, config.trials);
    assert!(!back.legacy.date.is_empty());
}

#[test]
fn validated_config_drives_composer() {
    let mut config = ExperimentConfig::default();
    config.hardware.output_sample_rate = 48000.0;
    config.startle.band_high_hz = 16000.0;
    config.prepulse.lowpass_hz = 12000.0;
    config.validate().unwrap();

    let mut composer = TrialComposer::new(config.trial_layout(), Synthesizer::seeded(1));
    let trial = composer.compose(config.conditioning.duration_ms, true).unwrap();
    assert_eq!(trial.onset_ms, config.startle_onset_ms(config.conditioning.duration_ms));
    assert_eq!(trial.left.sample_rate(), 48000.0);
}

#[test]
fn invalid_config_fails_validate() {
    let mut config = ExperimentConfig::default();
    config.hardware.output_sample_rate = 44100.0;
    let err = config.validate().unwrap_err();
    match err {
        ConfigError::Validation(ValidationError::InvalidBand { param, .. }) => {
            assert!(param.starts_with("startle."), "{param}");
        }
        other => panic!("unexpected {other}"),
    }
}
