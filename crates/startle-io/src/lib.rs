//! Boundary collaborators for acoustic startle experiments.
//!
//! This crate provides:
//!
//! - **Hardware boundary**: the [`HardwareIo`] trait that plays a stereo
//!   stimulus and returns the two recorded channels, plus
//!   [`SimulatedChamber`], a deterministic stand-in for the acquisition rig
//! - **Recordings**: [`RecordingWriter`] and [`read_recording`] for the
//!   plain-text recording format written by older acquisition software
//! - **WAV export**: [`read_wav`] and [`write_wav`] for stimuli and captures
//! - **Session runner**: [`ExperimentSession`] drives one trial at a time
//!   through compose, play, filter, score, and append
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use startle_config::ExperimentConfig;
//! use startle_io::{ExperimentSession, SimulatedChamber};
//!
//! let config = ExperimentConfig::default();
//! let chamber = SimulatedChamber::seeded(7);
//! let mut session = ExperimentSession::from_config(&config, chamber, 7)?
//!     .with_recording("run.txt")?;
//!
//! while let Some(result) = session.next_trial()? {
//!     println!("trial {} d' = {:.3}", result.index, result.discriminability.dprime);
//! }
//! # Ok::<(), startle_io::Error>(())
//! ```

mod hardware;
mod recording;
mod session;
mod wav;

/// Python dictionary literal text used by recording headers.
pub mod pydict;

pub use hardware::{
    Capture, ChamberSettings, HardwareIo, OUTPUT_LIMIT_VOLTS, SimulatedChamber, capture_len,
    clip_to,
};
pub use recording::{
    RecordedTrial, Recording, RecordingHeader, RecordingWriter, TrialInfo, read_recording,
};
pub use session::{ExperimentSession, TrialResult};
pub use wav::{WavSpec, read_wav, write_wav, write_wav_stereo};

use startle_config::ConfigError;
use startle_core::DspError;

/// Error types for experiment I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Signal processing error.
    #[error(transparent)]
    Dsp(#[from] DspError),

    /// Experiment configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Recording text that cannot be parsed.
    #[error("malformed recording at line {line}: {reason}")]
    MalformedRecording {
        /// 1-based line number.
        line: usize,
        /// Description of the problem.
        reason: String,
    },

    /// The acquisition hardware refused or failed a request.
    #[error("hardware error: {0}")]
    Hardware(String),
}

impl Error {
    /// Create a [`Error::MalformedRecording`] error.
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecording {
            line,
            reason: reason.into(),
        }
    }
}

/// Convenience result type for experiment I/O.
pub type Result<T> = std::result::Result<T, Error>;
