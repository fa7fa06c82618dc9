//! Batch analysis of a recorded session.
//!
//! Every response trace is band-filtered, cut to the startle window, screened
//! against the session's noise statistics, and the surviving trials are scored
//! into a fresh [`TrialResponseAnalyzer`].
//!
//! Screening runs in two passes. The first pass collects the standard
//! deviation of the baseline (the first `baseline_ms` of the window) and of
//! the whole window for every post-habituation trial, and averages them. The
//! second pass rejects a trial when
//!
//! - baseline std > `baseline_std_factor` × mean baseline std
//! - window std > `waveform_std_factor` × mean window std
//! - window std < `waveform_min_std_factor` × mean window std
//!
//! A trace too short to hold the window ends the analysis; later trials are
//! reported as truncated.

use crate::dynamics::{average_traces, mean, rms, std_dev};
use crate::filter::{BandFilter, StopbandRule};
use crate::response::{Discriminability, TrialResponseAnalyzer, TrialStatistics};
use serde::Serialize;
use startle_core::{DspError, Result, ms_to_samples};

/// One recorded trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialTrace {
    /// Response channel in volts.
    pub response: Vec<f64>,
    /// Sample rate of `response` in Hz.
    pub sample_rate: f64,
    /// Whether the trial carried a gap or prepulse.
    pub is_gap: bool,
    /// Startle onset from the start of the trace in ms.
    pub onset_ms: f64,
}

/// Window, filter, and rejection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    /// Offset of the window from startle onset, ms.
    pub start_ms: f64,
    /// Window length, ms.
    pub duration_ms: f64,
    /// Lower band edge of the response filter, Hz.
    pub highpass_hz: f64,
    /// Upper band edge of the response filter, Hz.
    pub lowpass_hz: f64,
    /// Baseline length at the start of the window, ms.
    pub baseline_ms: f64,
    /// Reject when the baseline std exceeds this multiple of the session mean.
    pub baseline_std_factor: f64,
    /// Reject when the window std exceeds this multiple of the session mean.
    pub waveform_std_factor: f64,
    /// Reject when the window std falls below this multiple of the session mean.
    pub waveform_min_std_factor: f64,
    /// Leading trials that are never scored.
    pub habituation: usize,
    /// Trials rejected by the experimenter (behaviour, orientation, ...).
    pub excluded_trials: Vec<usize>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            start_ms: 0.0,
            duration_ms: 100.0,
            highpass_hz: 50.0,
            lowpass_hz: 1000.0,
            baseline_ms: 10.0,
            baseline_std_factor: 3.0,
            waveform_std_factor: 3.0,
            waveform_min_std_factor: 0.1,
            habituation: 0,
            excluded_trials: Vec::new(),
        }
    }
}

/// Why a trial was or was not scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialVerdict {
    /// Scored into the statistics.
    Accepted,
    /// Part of the habituation block.
    Habituation,
    /// Listed in `excluded_trials`.
    Excluded,
    /// Baseline noise above threshold.
    BaselineTooNoisy,
    /// Window variance above threshold (movement artefact).
    SignalTooLarge,
    /// Window variance below threshold (no response recorded).
    SignalTooSmall,
    /// Trace too short for the analysis window.
    Truncated,
}

/// Per-trial result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialOutcome {
    /// Trial index in the recording.
    pub index: usize,
    /// Gap flag of the trial.
    pub is_gap: bool,
    /// Screening result.
    pub verdict: TrialVerdict,
    /// Baseline std (0 when not measured).
    pub baseline_std: f64,
    /// Window std (0 when not measured).
    pub signal_std: f64,
    /// RMS magnitude when the trial was scored.
    pub magnitude: Option<f64>,
}

/// Result of a batch analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// One entry per input trace.
    pub trials: Vec<TrialOutcome>,
    /// Final discriminability.
    pub discriminability: Discriminability,
    /// Gap and no-gap populations.
    pub statistics: TrialStatistics,
    /// Session mean of the baseline std.
    pub mean_baseline_std: f64,
    /// Session mean of the window std.
    pub mean_signal_std: f64,
    /// Window time axis in ms from window start.
    pub time_ms: Vec<f64>,
    /// Average of accepted gap windows.
    pub gap_average: Vec<f64>,
    /// Average of accepted no-gap windows.
    pub no_gap_average: Vec<f64>,
}

impl AnalysisReport {
    /// Number of trials with the given verdict.
    pub fn count(&self, verdict: TrialVerdict) -> usize {
        self.trials.iter().filter(|t| t.verdict == verdict).count()
    }

    /// `(time, sample)` pairs of the averaged gap window.
    pub fn gap_plot(&self) -> Vec<(f64, f64)> {
        self.time_ms.iter().copied().zip(self.gap_average.iter().copied()).collect()
    }

    /// `(time, sample)` pairs of the averaged no-gap window.
    pub fn no_gap_plot(&self) -> Vec<(f64, f64)> {
        self.time_ms.iter().copied().zip(self.no_gap_average.iter().copied()).collect()
    }
}

struct Window {
    start: usize,
    baseline_end: usize,
    end: usize,
}

/// Offline analysis pipeline.
#[derive(Debug, Clone)]
pub struct OfflineAnalysis {
    settings: AnalysisSettings,
}

impl OfflineAnalysis {
    /// Create a pipeline with the given settings.
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }

    /// Settings in use.
    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Analyze `traces`.
    ///
    /// # Errors
    ///
    /// - [`DspError::EmptySignal`] when `traces` is empty
    /// - [`DspError::InvalidFilterSpec`] when the response filter cannot be
    ///   designed at the recording's sample rate
    /// - [`DspError::InvalidSample`] when a scored window holds non-finite data
    pub fn run(&self, traces: &[TrialTrace]) -> Result<AnalysisReport> {
        self.run_with(traces, |_| {})
    }

    /// Analyze `traces`, calling `on_trial` as each trial's verdict is known.
    pub fn run_with<F>(&self, traces: &[TrialTrace], mut on_trial: F) -> Result<AnalysisReport>
    where
        F: FnMut(&TrialOutcome),
    {
        let s = &self.settings;
        let first = traces.first().ok_or(DspError::EmptySignal)?;
        let sample_rate = first.sample_rate;
        let filter = BandFilter::design(s.highpass_hz, s.lowpass_hz, sample_rate, StopbandRule::Wide)?;

        let filtered: Vec<Vec<f64>> = traces.iter().map(|t| filter.apply(&t.response)).collect();
        let window_len = ms_to_samples(s.duration_ms, sample_rate);
        let baseline_len = ms_to_samples(s.baseline_ms, sample_rate).min(window_len);

        // Trials before the first truncated record
        let windows: Vec<Option<Window>> = traces
            .iter()
            .map(|t| {
                let start = ms_to_samples(t.onset_ms + s.start_ms, sample_rate);
                let end = start + window_len;
                (window_len > 0 && end <= t.response.len()).then_some(Window {
                    start,
                    baseline_end: start + baseline_len,
                    end,
                })
            })
            .collect();
        let complete = windows.iter().position(Option::is_none).unwrap_or(traces.len());
        if complete < traces.len() {
            tracing::warn!(trial = complete, "truncated record, analysis stops here");
        }

        // First pass: session noise statistics
        let mut baseline_stds = Vec::new();
        let mut signal_stds = Vec::new();
        for (trace, window) in filtered.iter().zip(&windows).take(complete).skip(s.habituation) {
            if let Some(w) = window {
                baseline_stds.push(std_dev(&trace[w.start..w.baseline_end]));
                signal_stds.push(std_dev(&trace[w.start..w.end]));
            }
        }
        let mean_baseline_std = mean(&baseline_stds);
        let mean_signal_std = mean(&signal_stds);
        tracing::info!(
            trials = baseline_stds.len(),
            mean_baseline_std,
            mean_signal_std,
            "session noise statistics"
        );

        // Second pass: screen and score
        let mut analyzer = TrialResponseAnalyzer::new();
        analyzer.reset();
        let mut outcomes = Vec::with_capacity(traces.len());
        let mut gap_windows: Vec<&[f64]> = Vec::new();
        let mut no_gap_windows: Vec<&[f64]> = Vec::new();

        for (index, trace) in traces.iter().enumerate() {
            let mut outcome = TrialOutcome {
                index,
                is_gap: trace.is_gap,
                verdict: TrialVerdict::Truncated,
                baseline_std: 0.0,
                signal_std: 0.0,
                magnitude: None,
            };

            if index < complete {
                if let Some(w) = &windows[index] {
                    let data = &filtered[index];
                    let window = &data[w.start..w.end];
                    outcome.baseline_std = std_dev(&data[w.start..w.baseline_end]);
                    outcome.signal_std = std_dev(window);
                    outcome.verdict = self.screen(index, &outcome, mean_baseline_std, mean_signal_std);

                    if outcome.verdict == TrialVerdict::Accepted {
                        analyzer.accumulate(window, trace.is_gap)?;
                        outcome.magnitude = Some(rms(window));
                        if trace.is_gap {
                            gap_windows.push(window);
                        } else {
                            no_gap_windows.push(window);
                        }
                    } else if outcome.verdict != TrialVerdict::Habituation {
                        tracing::info!(
                            trial = index,
                            verdict = ?outcome.verdict,
                            baseline_std = outcome.baseline_std,
                            signal_std = outcome.signal_std,
                            "trial rejected"
                        );
                    }
                }
            }

            on_trial(&outcome);
            outcomes.push(outcome);
        }

        let time_ms = (0..window_len)
            .map(|i| i as f64 * 1000.0 / sample_rate)
            .collect();

        Ok(AnalysisReport {
            trials: outcomes,
            discriminability: analyzer.discriminability(),
            statistics: analyzer.statistics().clone(),
            mean_baseline_std,
            mean_signal_std,
            time_ms,
            gap_average: average_traces(gap_windows),
            no_gap_average: average_traces(no_gap_windows),
        })
    }

    fn screen(&self, index: usize, outcome: &TrialOutcome, avg_bl: f64, avg_sig: f64) -> TrialVerdict {
        let s = &self.settings;
        if index < s.habituation {
            TrialVerdict::Habituation
        } else if s.excluded_trials.contains(&index) {
            TrialVerdict::Excluded
        } else if outcome.baseline_std > s.baseline_std_factor * avg_bl {
            TrialVerdict::BaselineTooNoisy
        } else if outcome.signal_std > s.waveform_std_factor * avg_sig {
            TrialVerdict::SignalTooLarge
        } else if outcome.signal_std < s.waveform_min_std_factor * avg_sig {
            TrialVerdict::SignalTooSmall
        } else {
            TrialVerdict::Accepted
        }
    }
}
