//! Startle Core - value types and pure primitives for acoustic startle experiments
//!
//! This crate holds the building blocks that every other `startle` crate shares.
//! Nothing in here touches hardware, files, or global state; every function is a
//! pure computation over its arguments.
//!
//! # Waveforms
//!
//! - [`Waveform`] - Immutable sample buffer tagged with its sample rate
//!
//! # Envelope Shaping
//!
//! - [`rf_shape`] - Cosine-squared rise/fall gain envelope
//! - [`ramp_samples`] - Ramp length actually used for a given duration
//!
//! # Level Calibration
//!
//! - [`Calibration`] - dB SPL to output voltage conversion anchored to a measured point
//! - [`OutputChannel`] - Which loudspeaker a stimulus is destined for
//!
//! # Filters
//!
//! - [`Biquad`] - Second-order IIR section (Direct Form I, `f64`)
//! - [`SosFilter`] - Cascade of biquad sections with an overall gain
//!
//! # Errors
//!
//! - [`DspError`] - `InvalidFilterSpec`, `EmptySignal`, `InvalidSample`
//!
//! # Example
//!
//! ```rust
//! use startle_core::{rf_shape, Calibration, OutputChannel};
//!
//! // 100 ms tone envelope at 44.1 kHz with 2.5 ms ramps
//! let env = rf_shape(0.0, 100.0, 44100.0, 2.5);
//! assert_eq!(env.len(), 4410);
//! assert_eq!(env[0], 0.0);
//!
//! // The reference level maps to the reference voltage
//! let cal = Calibration::default();
//! assert!((cal.gain_for_level(86.0, OutputChannel::Conditioning) - 2.0).abs() < 1e-12);
//! ```

pub mod biquad;
pub mod calibration;
pub mod envelope;
pub mod error;
pub mod math;
pub mod waveform;

pub use biquad::{Biquad, SosFilter};
pub use calibration::{
    Calibration, OutputChannel, REF_CONDITIONING_DB, REF_STARTLE_DB, REF_VOLTS, gain_for_level,
};
pub use envelope::{ramp_samples, rf_shape};
pub use error::{DspError, Result, ensure_finite};
pub use math::{db_to_linear, linear_to_db, ms_to_samples, samples_to_ms};
pub use waveform::Waveform;
