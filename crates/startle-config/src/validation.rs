//! Experiment parameter validation.
//!
//! Validation collects every problem instead of stopping at the first one, so
//! a user editing a parameter file sees the full list at once.
//!
//! # Example
//!
//! ```rust
//! use startle_config::{ExperimentConfig, ValidationError, validate_experiment};
//!
//! let mut config = ExperimentConfig::default();
//! assert!(validate_experiment(&config).is_ok());
//!
//! config.startle.duration_ms = -5.0;
//! config.hardware.output_sample_rate = 44100.0; // 32 kHz startle band no longer fits
//! match validate_experiment(&config) {
//!     Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
//!     other => panic!("expected two errors, got {other:?}"),
//! }
//! ```

use startle_analysis::{BandEdges, StopbandRule};
use startle_synth::{StimulusMode, TRIAL_RISE_FALL_MS};
use thiserror::Error;

use crate::experiment::ExperimentConfig;

/// Highest level accepted for any stimulus, dB SPL.
pub const MAX_LEVEL_DB: f64 = 140.0;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Value out of range.
    #[error("parameter '{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted parameter path.
        param: String,
        /// The value that was out of range.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Band edges the elliptic design cannot realize.
    #[error("invalid band '{param}': {reason}")]
    InvalidBand {
        /// Dotted parameter path.
        param: String,
        /// Description of the problem.
        reason: String,
    },

    /// Inconsistent combination of values.
    #[error("invalid parameter '{param}': {reason}")]
    Inconsistent {
        /// Dotted parameter path.
        param: String,
        /// Description of the problem.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[derive(Default)]
struct Collector {
    errors: Vec<ValidationError>,
}

impl Collector {
    fn range(&mut self, param: &str, value: f64, min: f64, max: f64) {
        if !(value >= min && value <= max) {
            self.errors.push(ValidationError::OutOfRange {
                param: param.to_string(),
                value,
                min,
                max,
            });
        }
    }

    fn non_negative(&mut self, param: &str, value: f64) {
        self.range(param, value, 0.0, f64::INFINITY);
    }

    fn positive(&mut self, param: &str, value: f64) {
        self.range(param, value, f64::MIN_POSITIVE, f64::INFINITY);
    }

    fn band(&mut self, param: &str, low_hz: f64, high_hz: f64, sample_rate: f64, rule: StopbandRule) {
        if let Err(e) = BandEdges::new(low_hz, high_hz, sample_rate, rule).and_then(|edges| edges.check()) {
            self.errors.push(ValidationError::InvalidBand {
                param: param.to_string(),
                reason: e.to_string(),
            });
        }
    }

    fn inconsistent(&mut self, param: &str, reason: impl Into<String>) {
        self.errors.push(ValidationError::Inconsistent {
            param: param.to_string(),
            reason: reason.into(),
        });
    }

    fn finish(mut self) -> ValidationResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ValidationError::Multiple(self.errors)),
        }
    }
}

/// Validate a complete experiment configuration.
///
/// Checks durations, levels, sample rates, rise/fall fit, trial counts, and
/// every band edge pair against the sample rate and stopband rule it will be
/// designed with (noise bands at the output rate with the narrow rule, the
/// response band at the input rate with the wide rule).
pub fn validate_experiment(config: &ExperimentConfig) -> ValidationResult<()> {
    let mut c = Collector::default();
    let out_sr = config.hardware.output_sample_rate;
    let in_sr = config.hardware.input_sample_rate;

    c.positive("hardware.output_sample_rate", out_sr);
    c.positive("hardware.input_sample_rate", in_sr);
    c.non_negative("hardware.post_duration_s", config.hardware.post_duration_s);

    let cond = &config.conditioning;
    c.non_negative("conditioning.duration_ms", cond.duration_ms);
    c.range("conditioning.variation_ms", cond.variation_ms, 0.0, 2.0 * cond.duration_ms.max(0.0));
    c.range("conditioning.level_db", cond.level_db, 0.0, MAX_LEVEL_DB);

    let pp = &config.prepulse;
    c.range("prepulse.level_db", pp.level_db, 0.0, MAX_LEVEL_DB);
    c.non_negative("prepulse.duration_ms", pp.duration_ms);
    if pp.duration_ms < 2.0 * TRIAL_RISE_FALL_MS {
        c.inconsistent(
            "prepulse.duration_ms",
            format!("window shorter than two {TRIAL_RISE_FALL_MS} ms ramps"),
        );
    }
    if pp.mode == StimulusMode::Tone || cond.mode == StimulusMode::Tone {
        c.range("prepulse.frequency_hz", pp.frequency_hz, f64::MIN_POSITIVE, out_sr / 2.0);
    }
    if pp.mode == StimulusMode::BandpassNoise || cond.mode == StimulusMode::BandpassNoise {
        c.band("prepulse.highpass_hz..lowpass_hz", pp.highpass_hz, pp.lowpass_hz, out_sr, StopbandRule::Narrow);
    }

    let st = &config.startle;
    c.non_negative("startle.pre_duration_ms", st.pre_duration_ms);
    c.non_negative("startle.duration_ms", st.duration_ms);
    if st.duration_ms >= 0.0 && st.duration_ms < 2.0 * TRIAL_RISE_FALL_MS {
        c.inconsistent(
            "startle.duration_ms",
            format!("burst shorter than two {TRIAL_RISE_FALL_MS} ms ramps"),
        );
    }
    c.range("startle.level_db", st.level_db, 0.0, MAX_LEVEL_DB);
    c.band("startle.band_low_hz..band_high_hz", st.band_low_hz, st.band_high_hz, out_sr, StopbandRule::Narrow);

    let tr = &config.trials;
    if tr.count == 0 {
        c.inconsistent("trials.count", "at least one test trial is required");
    }
    c.non_negative("trials.iti_s", tr.iti_s);
    c.range("trials.iti_variation_s", tr.iti_variation_s, 0.0, 2.0 * tr.iti_s.max(0.0));

    let an = &config.analysis;
    c.non_negative("analysis.start_ms", an.start_ms);
    c.positive("analysis.duration_ms", an.duration_ms);
    c.range("analysis.baseline_ms", an.baseline_ms, f64::MIN_POSITIVE, an.duration_ms.max(0.0));
    c.positive("analysis.baseline_std_factor", an.baseline_std_factor);
    c.positive("analysis.waveform_std_factor", an.waveform_std_factor);
    c.range(
        "analysis.waveform_min_std_factor",
        an.waveform_min_std_factor,
        0.0,
        an.waveform_std_factor.max(0.0),
    );
    c.band("analysis.highpass_hz..lowpass_hz", an.highpass_hz, an.lowpass_hz, in_sr, StopbandRule::Wide);

    c.positive("calibration.reference_volts", config.calibration.reference_volts);

    c.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_experiment(&ExperimentConfig::default()), Ok(()));
    }

    #[test]
    fn single_error_is_not_wrapped() {
        let mut config = ExperimentConfig::default();
        config.trials.count = 0;
        assert!(matches!(
            validate_experiment(&config),
            Err(ValidationError::Inconsistent { ref param, .. }) if param == "trials.count"
        ));
    }

    #[test]
    fn response_band_checked_at_input_rate() {
        let mut config = ExperimentConfig::default();
        // 2 × 8 kHz is beyond Nyquist of the 24.4 kHz input
        config.analysis.lowpass_hz = 8000.0;
        let err = validate_experiment(&config).unwrap_err();
        assert!(err.to_string().contains("analysis.highpass_hz..lowpass_hz"), "{err}");
    }

    #[test]
    fn noise_band_only_checked_when_used() {
        let mut config = ExperimentConfig::default();
        config.conditioning.mode = StimulusMode::BroadbandNoise;
        config.prepulse.highpass_hz = 20000.0;
        config.prepulse.lowpass_hz = 1000.0;
        assert!(validate_experiment(&config).is_ok());

        config.prepulse.mode = StimulusMode::BandpassNoise;
        assert!(matches!(validate_experiment(&config), Err(ValidationError::InvalidBand { .. })));
    }

    #[test]
    fn jitter_wider_than_mean_rejected() {
        let mut config = ExperimentConfig::default();
        config.conditioning.duration_ms = 100.0;
        config.conditioning.variation_ms = 250.0;
        config.trials.iti_s = 1.0;
        config.trials.iti_variation_s = 3.0;
        match validate_experiment(&config) {
            Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn nan_is_out_of_range() {
        let mut config = ExperimentConfig::default();
        config.startle.level_db = f64::NAN;
        assert!(matches!(validate_experiment(&config), Err(ValidationError::OutOfRange { .. })));
    }

    #[test]
    fn multiple_display_joins() {
        let err = ValidationError::Multiple(vec![
            ValidationError::Inconsistent {
                param: "a".into(),
                reason: "x".into(),
            },
            ValidationError::Inconsistent {
                param: "b".into(),
                reason: "y".into(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "multiple validation errors: invalid parameter 'a': x; invalid parameter 'b': y"
        );
    }
}
