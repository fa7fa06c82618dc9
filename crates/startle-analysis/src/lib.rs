//! Startle Analysis - spectral estimation, band filtering, and response scoring
//!
//! - [`fft`] - FFT wrapper over rustfft
//! - [`spectrum`] - Zero-padded one-sided power spectrum
//! - [`elliptic`] - Elliptic band-pass design (order selection, prototype, bilinear transform)
//! - [`filter`] - Band filters with the noise-shaping and response-analysis stopband rules
//! - [`dynamics`] - RMS, mean, population standard deviation, trace averaging
//! - [`response`] - Online gap / no-gap statistics and d-prime
//! - [`offline`] - Batch analysis of a recorded session with trial rejection
//!
//! ## Example
//!
//! ```rust
//! use startle_analysis::{TrialResponseAnalyzer, band_filter, power_spectrum};
//!
//! let sr = 24414.0625;
//! let trace: Vec<f64> = (0..4096)
//!     .map(|i| (2.0 * std::f64::consts::PI * 200.0 * i as f64 / sr).sin())
//!     .collect();
//!
//! let filtered = band_filter(&trace, 50.0, 1000.0, sr).unwrap();
//! let spectrum = power_spectrum(&filtered, sr).unwrap();
//! assert!((spectrum.peak_frequency().unwrap() - 200.0).abs() <= spectrum.bin_width());
//!
//! let mut analyzer = TrialResponseAnalyzer::new();
//! analyzer.score(0, &[], false).unwrap();
//! analyzer.score(1, &filtered, false).unwrap();
//! ```

pub mod dynamics;
pub mod elliptic;
pub mod fft;
pub mod filter;
pub mod offline;
pub mod response;
pub mod spectrum;

pub use dynamics::{average_traces, mean, rms, std_dev};
pub use fft::Fft;
pub use filter::{BandEdges, BandFilter, StopbandRule, band_filter};
pub use offline::{
    AnalysisReport, AnalysisSettings, OfflineAnalysis, TrialOutcome, TrialTrace, TrialVerdict,
};
pub use response::{
    AnalyzerState, Discriminability, PopulationStats, TrialResponseAnalyzer, TrialStatistics,
};
pub use spectrum::{PowerSpectrum, padded_len, power_spectrum};
