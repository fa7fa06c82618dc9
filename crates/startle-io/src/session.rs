//! One experiment run, driven a trial at a time.
//!
//! The caller owns the timing: it calls [`ExperimentSession::next_trial`],
//! waits the returned inter-trial interval, and calls again. A stop request
//! (from a Ctrl-C handler, say) is honoured before the next trial starts;
//! a trial in progress always completes.

use crate::Result;
use crate::hardware::{Capture, HardwareIo};
use crate::recording::{RecordingHeader, RecordingWriter, TrialInfo};
use rand::SeedableRng;
use rand::rngs::StdRng;
use startle_analysis::{
    AnalysisSettings, BandFilter, Discriminability, StopbandRule, TrialResponseAnalyzer,
    TrialStatistics, rms,
};
use startle_config::ExperimentConfig;
use startle_core::ms_to_samples;
use startle_synth::{Synthesizer, TrialComposer, TrialPlan, TrialStimulus};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Everything known about one completed trial.
#[derive(Debug, Clone)]
pub struct TrialResult {
    /// Position in the plan.
    pub index: usize,
    /// Whether the trial carried a gap or prepulse.
    pub is_gap: bool,
    /// Habituation trials are played and recorded but not scored.
    pub habituation: bool,
    /// Wait before the next trial, seconds.
    pub iti_s: f64,
    /// Conditioning duration used, ms.
    pub conditioning_ms: f64,
    /// Startle onset from the start of the trial, ms.
    pub onset_ms: f64,
    /// RMS of the filtered response window, when the trial was scored.
    pub magnitude: Option<f64>,
    /// Running discriminability after this trial.
    pub discriminability: Discriminability,
    /// The stimulus that was played.
    pub stimulus: TrialStimulus,
    /// The recorded channels.
    pub capture: Capture,
}

/// Runs the trials of one experiment against a [`HardwareIo`] device.
pub struct ExperimentSession<H: HardwareIo> {
    plan: TrialPlan,
    composer: TrialComposer,
    hardware: H,
    analyzer: TrialResponseAnalyzer,
    filter: BandFilter,
    analysis: AnalysisSettings,
    post_duration_s: f64,
    header: RecordingHeader,
    recorder: Option<RecordingWriter>,
    next: usize,
    stop: Arc<AtomicBool>,
}

impl<H: HardwareIo> ExperimentSession<H> {
    /// Session for `config` with an explicit plan and synthesizer.
    ///
    /// The stimulus is synthesized at the device's output rate and the
    /// response filter designed at its input rate, whatever the configuration
    /// file says; the configuration is validated against those rates.
    pub fn new(config: &ExperimentConfig, hardware: H, plan: TrialPlan, synth: Synthesizer) -> Result<Self> {
        let mut config = config.clone();
        config.hardware.output_sample_rate = hardware.output_sample_rate();
        config.hardware.input_sample_rate = hardware.input_sample_rate();
        config.validate()?;

        let analysis = config.analysis_settings();
        let filter = BandFilter::design(
            analysis.highpass_hz,
            analysis.lowpass_hz,
            hardware.input_sample_rate(),
            StopbandRule::Wide,
        )?;
        let header = RecordingHeader::from_config(&config, plan.gap_list());

        tracing::info!(
            device = hardware.name(),
            trials = plan.len(),
            habituation = config.trials.habituation,
            filter_order = filter.order(),
            "session ready"
        );
        Ok(Self {
            plan,
            composer: TrialComposer::new(config.trial_layout(), synth),
            hardware,
            analyzer: TrialResponseAnalyzer::new(),
            filter,
            analysis,
            post_duration_s: config.hardware.post_duration_s,
            header,
            recorder: None,
            next: 0,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Session with a plan and noise both derived from `seed`.
    pub fn from_config(config: &ExperimentConfig, hardware: H, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let plan = TrialPlan::generate(&config.plan_settings(), &mut rng);
        let mut synth = Synthesizer::seeded(seed.wrapping_add(1));
        synth.set_calibration(config.calibration());
        Self::new(config, hardware, plan, synth)
    }

    /// Append every trial to a recording at `path`.
    pub fn with_recording(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.recorder = Some(RecordingWriter::create(path, &self.header)?);
        Ok(self)
    }

    /// Share an externally owned stop flag.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = flag;
        self
    }

    /// Flag that ends the run before the next trial when set.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Request that no further trials run.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Trials completed so far.
    pub fn trials_run(&self) -> usize {
        self.next
    }

    /// The trial plan.
    pub fn plan(&self) -> &TrialPlan {
        &self.plan
    }

    /// The device.
    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    /// Header written to the recording.
    pub fn header(&self) -> &RecordingHeader {
        &self.header
    }

    /// Recording file, if one is being written.
    pub fn recording_path(&self) -> Option<&Path> {
        self.recorder.as_ref().map(RecordingWriter::path)
    }

    /// Online statistics.
    pub fn statistics(&self) -> &TrialStatistics {
        self.analyzer.statistics()
    }

    /// Current discriminability.
    pub fn discriminability(&self) -> Discriminability {
        self.analyzer.discriminability()
    }

    /// Run the next trial: compose, play, filter, score, and append.
    ///
    /// Returns `None` once the plan is exhausted or a stop was requested.
    /// Trial 0 resets the online statistics; habituation trials are played
    /// and recorded but not scored.
    pub fn next_trial(&mut self) -> Result<Option<TrialResult>> {
        if self.is_stopped() {
            tracing::info!(completed = self.next, "session stopped");
            return Ok(None);
        }
        let Some(planned) = self.plan.get(self.next).copied() else {
            return Ok(None);
        };

        let stimulus = self.composer.compose(planned.conditioning_ms, planned.is_gap)?;
        let capture = self
            .hardware
            .play(&stimulus.left, &stimulus.right, self.post_duration_s)?;

        let filtered = self.filter.apply(&capture.channel1);
        let sr = capture.sample_rate;
        let start = ms_to_samples(stimulus.onset_ms + self.analysis.start_ms, sr).min(filtered.len());
        let end = (start + ms_to_samples(self.analysis.duration_ms, sr)).min(filtered.len());
        let window = &filtered[start..end];

        let (discriminability, magnitude) = if planned.index == 0 {
            (self.analyzer.score(0, window, planned.is_gap)?, None)
        } else if planned.habituation {
            (self.analyzer.discriminability(), None)
        } else {
            let d = self.analyzer.score(planned.index, window, planned.is_gap)?;
            (d, Some(rms(window)))
        };

        if let Some(recorder) = self.recorder.as_mut() {
            let info = TrialInfo {
                is_gap: planned.is_gap,
                iti_s: planned.iti_s,
                conditioning_ms: planned.conditioning_ms,
                output_sample_rate: Some(self.hardware.output_sample_rate()),
            };
            recorder.append(&info, &capture)?;
        }

        tracing::info!(
            trial = planned.index,
            of = self.plan.len(),
            is_gap = planned.is_gap,
            habituation = planned.habituation,
            dprime = discriminability.dprime,
            "trial complete"
        );
        self.next += 1;
        Ok(Some(TrialResult {
            index: planned.index,
            is_gap: planned.is_gap,
            habituation: planned.habituation,
            iti_s: planned.iti_s,
            conditioning_ms: planned.conditioning_ms,
            onset_ms: stimulus.onset_ms,
            magnitude,
            discriminability,
            stimulus,
            capture,
        }))
    }
}

impl<H: HardwareIo> std::fmt::Debug for ExperimentSession<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentSession")
            .field("device", &self.hardware.name())
            .field("trials", &self.plan.len())
            .field("next", &self.next)
            .field("recording", &self.recording_path())
            .finish_non_exhaustive()
    }
}
