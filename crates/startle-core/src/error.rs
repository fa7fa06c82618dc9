//! Error taxonomy shared by the signal-processing crates.
//!
//! All three variants represent caller contract violations or corrupted
//! recordings. None of them is retryable; they are surfaced immediately.

use thiserror::Error;

/// Errors produced by synthesis, filtering, and analysis routines.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DspError {
    /// Band edges are malformed: out of the open interval (0, Nyquist),
    /// inverted, or otherwise impossible to design a filter for.
    #[error("invalid filter spec: {0}")]
    InvalidFilterSpec(String),

    /// A routine that needs at least one sample received none.
    #[error("empty signal")]
    EmptySignal,

    /// A per-trial signal was empty or contained a non-finite value.
    #[error("invalid sample: {0}")]
    InvalidSample(String),
}

impl DspError {
    /// Create an `InvalidFilterSpec` error from anything displayable.
    pub fn filter_spec(reason: impl Into<String>) -> Self {
        DspError::InvalidFilterSpec(reason.into())
    }

    /// Create an `InvalidSample` error from anything displayable.
    pub fn sample(reason: impl Into<String>) -> Self {
        DspError::InvalidSample(reason.into())
    }
}

/// Convenience result type for DSP operations.
pub type Result<T> = std::result::Result<T, DspError>;

/// Reject empty or non-finite input.
///
/// Returns the index of the first offending sample in the error message so a
/// corrupted recording can be located.
pub fn ensure_finite(signal: &[f64]) -> Result<()> {
    if signal.is_empty() {
        return Err(DspError::sample("signal is empty"));
    }
    if let Some((index, value)) = signal.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(DspError::sample(format!(
            "non-finite value {value} at index {index}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            DspError::filter_spec("low >= high").to_string(),
            "invalid filter spec: low >= high"
        );
        assert_eq!(DspError::EmptySignal.to_string(), "empty signal");
        assert_eq!(
            DspError::sample("nan").to_string(),
            "invalid sample: nan"
        );
    }

    #[test]
    fn ensure_finite_rejects_empty() {
        assert!(matches!(ensure_finite(&[]), Err(DspError::InvalidSample(_))));
    }

    #[test]
    fn ensure_finite_reports_index() {
        let err = ensure_finite(&[0.0, 1.0, f64::INFINITY]).unwrap_err();
        assert!(err.to_string().contains("index 2"), "got: {err}");
    }

    #[test]
    fn ensure_finite_accepts_normal_signal() {
        assert!(ensure_finite(&[0.0, -1.0, 1e9]).is_ok());
    }
}
