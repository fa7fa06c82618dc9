//! Plain-text trial recordings.
//!
//! The format is line oriented:
//!
//! ```text
//! {'CN_Level': 70.0, 'CN_Dur': 200.0, 'PP_Dur': 20.0, 'PS_Dur': 100.0, ...}
//! {'GapList': [False, True, True, False]}
//! {'Points': 8546, 'inSampleFreq': 24414.0625, 'outSampleFreq': 100000.0, 'GapMode': False, 'ITI': 19.2, 'CNDur': 203.1}
//! 0.000000 0.012207 -0.001526
//! 0.000041 0.010986 -0.000916
//! ...
//! ```
//!
//! Line 1 holds the experiment parameters, line 2 the gap sequence. Each
//! trial is a dictionary line followed by `Points` lines of
//! `time_s ch1_mV ch2_mV`. Channels are stored in millivolts and converted
//! back to volts on reading.

use crate::hardware::Capture;
use crate::pydict::{PyDict, PyValue};
use crate::{Error, Result};
use startle_analysis::TrialTrace;
use startle_config::{ExperimentConfig, mode_from_code, mode_to_code};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Experiment parameters and gap sequence at the top of a recording.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingHeader {
    /// Parameter dictionary, keyed by the legacy parameter names.
    pub params: PyDict,
    /// Planned gap flag for every trial.
    pub gap_list: Vec<bool>,
}

impl RecordingHeader {
    /// Header for a run of `config` with the given gap sequence.
    pub fn from_config(config: &ExperimentConfig, gap_list: Vec<bool>) -> Self {
        let mut p = PyDict::new();
        p.insert("CN_Level", config.conditioning.level_db);
        p.insert("CN_Dur", config.conditioning.duration_ms);
        p.insert("CN_Var", config.conditioning.variation_ms);
        p.insert("PP_Level", config.prepulse.level_db);
        p.insert("PP_OffLevel", config.prepulse.off_level_db);
        p.insert("PP_Dur", config.prepulse.duration_ms);
        p.insert("PS_Dur", config.startle.pre_duration_ms);
        p.insert("ST_Dur", config.startle.duration_ms);
        p.insert("ST_Level", config.startle.level_db);
        p.insert("StimEnable", config.flags.stim_enable);
        p.insert("WavePlot", config.flags.wave_plot);
        p.insert("PP_Freq", config.prepulse.frequency_hz);
        p.insert("PP_HP", config.prepulse.highpass_hz);
        p.insert("PP_LP", config.prepulse.lowpass_hz);
        p.insert("PP_Mode", mode_to_code(config.prepulse.mode));
        p.insert("CN_Mode", mode_to_code(config.conditioning.mode));
        p.insert("PP_Notch_F1", config.legacy.notch_hz[0]);
        p.insert("PP_Notch_F2", config.legacy.notch_hz[1]);
        p.insert("PP_MultiFreq", config.legacy.multi_freq.as_str());
        p.insert("PP_GapFlag", config.prepulse.gap);
        p.insert("ITI_Var", config.trials.iti_variation_s);
        p.insert("ITI", config.trials.iti_s);
        p.insert("Trials", config.trials.count);
        p.insert("NHabTrials", config.trials.habituation);
        p.insert("Analysis_Start", config.analysis.start_ms);
        p.insert("Analysis_Duration", config.analysis.duration_ms);
        p.insert("Analysis_HPF", config.analysis.highpass_hz);
        p.insert("Analysis_LPF", config.analysis.lowpass_hz);
        Self { params: p, gap_list }
    }

    /// Gap or prepulse window length in ms (`PP_Dur`, 0 when absent).
    pub fn prepulse_ms(&self) -> f64 {
        self.params.f64("PP_Dur").unwrap_or(0.0)
    }

    /// Interval between prepulse and startle in ms (`PS_Dur`, 0 when absent).
    pub fn prestartle_ms(&self) -> f64 {
        self.params.f64("PS_Dur").unwrap_or(0.0)
    }

    /// Rebuild an experiment configuration from the stored parameters.
    ///
    /// Parameters missing from the header keep their defaults; unknown
    /// waveform codes are logged and ignored.
    pub fn to_config(&self, name: impl Into<String>) -> ExperimentConfig {
        let mut c = ExperimentConfig::new(name);
        let p = &self.params;
        let num = |key: &str, out: &mut f64| {
            if let Some(v) = p.f64(key) {
                *out = v;
            }
        };
        num("CN_Level", &mut c.conditioning.level_db);
        num("CN_Dur", &mut c.conditioning.duration_ms);
        num("CN_Var", &mut c.conditioning.variation_ms);
        num("PP_Level", &mut c.prepulse.level_db);
        num("PP_OffLevel", &mut c.prepulse.off_level_db);
        num("PP_Dur", &mut c.prepulse.duration_ms);
        num("PS_Dur", &mut c.startle.pre_duration_ms);
        num("ST_Dur", &mut c.startle.duration_ms);
        num("ST_Level", &mut c.startle.level_db);
        num("PP_Freq", &mut c.prepulse.frequency_hz);
        num("PP_HP", &mut c.prepulse.highpass_hz);
        num("PP_LP", &mut c.prepulse.lowpass_hz);
        num("PP_Notch_F1", &mut c.legacy.notch_hz[0]);
        num("PP_Notch_F2", &mut c.legacy.notch_hz[1]);
        num("ITI_Var", &mut c.trials.iti_variation_s);
        num("ITI", &mut c.trials.iti_s);
        num("Analysis_Start", &mut c.analysis.start_ms);
        num("Analysis_Duration", &mut c.analysis.duration_ms);
        num("Analysis_HPF", &mut c.analysis.highpass_hz);
        num("Analysis_LPF", &mut c.analysis.lowpass_hz);

        let flag = |key: &str, out: &mut bool| {
            if let Some(v) = p.get(key).and_then(PyValue::as_bool) {
                *out = v;
            }
        };
        flag("StimEnable", &mut c.flags.stim_enable);
        flag("WavePlot", &mut c.flags.wave_plot);
        flag("PP_GapFlag", &mut c.prepulse.gap);

        let count = |key: &str, out: &mut usize| {
            if let Some(v) = p.get(key).and_then(PyValue::as_i64) {
                *out = usize::try_from(v).unwrap_or(0);
            }
        };
        count("Trials", &mut c.trials.count);
        count("NHabTrials", &mut c.trials.habituation);

        for (key, out) in [("CN_Mode", &mut c.conditioning.mode), ("PP_Mode", &mut c.prepulse.mode)] {
            if let Some(code) = p.get(key).and_then(PyValue::as_i64) {
                match mode_from_code(code) {
                    Some(mode) => *out = mode,
                    None => tracing::warn!(key, code, "unknown waveform code, keeping default"),
                }
            }
        }
        if let Some(s) = p.get("PP_MultiFreq").and_then(PyValue::as_str) {
            c.legacy.multi_freq = s.to_string();
        }
        c
    }
}

/// Per-trial metadata stored ahead of the samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialInfo {
    /// Whether the trial carried a gap or prepulse.
    pub is_gap: bool,
    /// Inter-trial interval in seconds.
    pub iti_s: f64,
    /// Conditioning duration of this trial in ms.
    pub conditioning_ms: f64,
    /// Stimulus sample rate, when recorded.
    pub output_sample_rate: Option<f64>,
}

/// One trial read back from a recording.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTrial {
    /// Trial metadata.
    pub info: TrialInfo,
    /// Sample rate of both channels in Hz.
    pub sample_rate: f64,
    /// Time column in seconds.
    pub time_s: Vec<f64>,
    /// Response channel in volts.
    pub channel1: Vec<f64>,
    /// Microphone channel in volts.
    pub channel2: Vec<f64>,
}

/// A parsed recording file.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    /// Experiment parameters and gap sequence.
    pub header: RecordingHeader,
    /// Complete trials in file order.
    pub trials: Vec<RecordedTrial>,
    /// True when the file ended part-way through a trial, which was dropped.
    pub truncated: bool,
}

impl Recording {
    /// Parse recording text.
    pub fn parse(text: &str) -> Result<Self> {
        let lines: Vec<(usize, &str)> = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty())
            .collect();

        let Some(&(header_line, header_text)) = lines.first() else {
            return Err(Error::malformed(1, "empty recording"));
        };
        let params = parse_dict(header_line, header_text)?;

        let mut header = RecordingHeader {
            params,
            gap_list: Vec::new(),
        };
        if let Some(&(line, text)) = lines.get(1) {
            let gaps = parse_dict(line, text)?;
            header.gap_list = match gaps.get("GapList") {
                Some(PyValue::List(items)) => items
                    .iter()
                    .map(|v| v.as_bool().ok_or_else(|| Error::malformed(line, format!("gap flag {v} is not a boolean"))))
                    .collect::<Result<_>>()?,
                Some(other) => return Err(Error::malformed(line, format!("GapList is not a list: {other}"))),
                None => return Err(Error::malformed(line, "missing GapList")),
            };
        }

        let default_cond = header.params.f64("CN_Dur").unwrap_or(0.0);
        let default_iti = header.params.f64("ITI").unwrap_or(0.0);
        let mut trials = Vec::new();
        let mut truncated = false;
        let mut cursor = 2;

        while cursor < lines.len() {
            let (info_line, info_text) = lines[cursor];
            let dict = match parse_dict(info_line, info_text) {
                Ok(dict) => dict,
                // Cut off while the trial header itself was being written
                Err(_) if cursor == lines.len() - 1 => {
                    tracing::warn!(
                        trial = trials.len(),
                        line = info_line,
                        "recording ends inside a trial header, dropping it"
                    );
                    truncated = true;
                    break;
                }
                Err(e) => return Err(e),
            };
            let points = dict
                .get("Points")
                .and_then(PyValue::as_i64)
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| Error::malformed(info_line, "trial header without a valid 'Points'"))?;
            let info = TrialInfo {
                is_gap: dict.get("GapMode").and_then(PyValue::as_bool).unwrap_or(false),
                iti_s: dict.f64("ITI").unwrap_or(default_iti),
                conditioning_ms: dict.f64("CNDur").unwrap_or(default_cond),
                output_sample_rate: dict.f64("outSampleFreq"),
            };
            cursor += 1;

            let data_end = cursor + points;
            let available = data_end.min(lines.len());
            let mut time_s = Vec::with_capacity(points);
            let mut channel1 = Vec::with_capacity(points);
            let mut channel2 = Vec::with_capacity(points);
            let mut broken = false;
            for &(line, text) in &lines[cursor..available] {
                match parse_triple(text) {
                    Some([t, a, b]) => {
                        time_s.push(t);
                        channel1.push(a / 1000.0);
                        channel2.push(b / 1000.0);
                    }
                    // A half-written final line is a truncation, anything
                    // earlier is corruption
                    None if line == lines[lines.len() - 1].0 => {
                        broken = true;
                        break;
                    }
                    None => return Err(Error::malformed(line, format!("expected three numbers, found '{text}'"))),
                }
            }
            if broken || available < data_end {
                tracing::warn!(
                    trial = trials.len(),
                    expected = points,
                    found = time_s.len(),
                    "recording ends part-way through a trial, dropping it"
                );
                truncated = true;
                break;
            }
            cursor = data_end;

            let sample_rate = match dict.f64("inSampleFreq") {
                Some(sr) if sr > 0.0 => sr,
                _ => rate_from_time(&time_s).ok_or_else(|| {
                    Error::malformed(info_line, "no 'inSampleFreq' and the time column gives no rate")
                })?,
            };
            trials.push(RecordedTrial {
                info,
                sample_rate,
                time_s,
                channel1,
                channel2,
            });
        }

        tracing::debug!(trials = trials.len(), truncated, "parsed recording");
        Ok(Self {
            header,
            trials,
            truncated,
        })
    }

    /// Startle onset of `trial` in ms from the start of its record.
    pub fn onset_ms(&self, trial: &RecordedTrial) -> f64 {
        trial.info.conditioning_ms + self.header.prepulse_ms() + self.header.prestartle_ms()
    }

    /// Response channels as analysis input.
    pub fn trial_traces(&self) -> Vec<TrialTrace> {
        self.trials
            .iter()
            .map(|t| TrialTrace {
                response: t.channel1.clone(),
                sample_rate: t.sample_rate,
                is_gap: t.info.is_gap,
                onset_ms: self.onset_ms(t),
            })
            .collect()
    }
}

/// Read and parse a recording file.
pub fn read_recording(path: impl AsRef<Path>) -> Result<Recording> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let recording = Recording::parse(&text)?;
    tracing::info!(
        path = %path.display(),
        trials = recording.trials.len(),
        truncated = recording.truncated,
        "loaded recording"
    );
    Ok(recording)
}

fn parse_dict(line: usize, text: &str) -> Result<PyDict> {
    PyDict::parse(text).map_err(|reason| Error::malformed(line, reason))
}

fn parse_triple(text: &str) -> Option<[f64; 3]> {
    let mut fields = text.split_whitespace().map(str::parse::<f64>);
    let t = fields.next()?.ok()?;
    let a = fields.next()?.ok()?;
    let b = fields.next()?.ok()?;
    Some([t, a, b])
}

fn rate_from_time(time_s: &[f64]) -> Option<f64> {
    let (first, last) = (time_s.first()?, time_s.last()?);
    let span = last - first;
    (time_s.len() > 1 && span > 0.0).then(|| (time_s.len() - 1) as f64 / span)
}

/// Appends trials to a recording file.
///
/// The header is written on creation. Each trial is flushed as soon as it is
/// appended, so an interrupted run leaves every finished trial readable.
#[derive(Debug)]
pub struct RecordingWriter {
    out: BufWriter<File>,
    path: PathBuf,
    trials: usize,
}

impl RecordingWriter {
    /// Create `path` (and its parent directories) and write the header.
    pub fn create(path: impl AsRef<Path>, header: &RecordingHeader) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(path)?);

        let mut gaps = PyDict::new();
        gaps.insert("GapList", header.gap_list.clone());
        writeln!(out, "{} ", header.params)?;
        writeln!(out, "{gaps} ")?;
        out.flush()?;

        tracing::info!(path = %path.display(), "recording started");
        Ok(Self {
            out,
            path: path.to_path_buf(),
            trials: 0,
        })
    }

    /// Append one trial.
    pub fn append(&mut self, info: &TrialInfo, capture: &Capture) -> Result<()> {
        let points = capture.channel1.len().min(capture.channel2.len());
        let mut d = PyDict::new();
        d.insert("Points", points);
        d.insert("inSampleFreq", capture.sample_rate);
        if let Some(sr) = info.output_sample_rate {
            d.insert("outSampleFreq", sr);
        }
        d.insert("GapMode", info.is_gap);
        d.insert("ITI", info.iti_s);
        d.insert("CNDur", info.conditioning_ms);
        writeln!(self.out, "{d} ")?;

        for (i, (a, b)) in capture.channel1.iter().zip(&capture.channel2).enumerate() {
            let t = i as f64 / capture.sample_rate;
            writeln!(self.out, "{t:.6} {:.6} {:.6}", 1000.0 * a, 1000.0 * b)?;
        }
        self.out.flush()?;
        self.trials += 1;
        tracing::debug!(trial = self.trials - 1, points, "trial appended");
        Ok(())
    }

    /// Trials appended so far.
    pub fn trials_written(&self) -> usize {
        self.trials
    }

    /// File being written.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use startle_synth::StimulusMode;

    const SAMPLE: &str = "\
{'CN_Level': 70.0, 'CN_Dur': 200.0, 'PP_Dur': 20.0, 'PS_Dur': 100.0, 'PP_Mode': 0, 'CN_Mode': 2, 'Trials': 2, 'NHabTrials': 0}
{'GapList': [True, False]}
{'Points': 3, 'inSampleFreq': 1000.0, 'GapMode': True, 'ITI': 19.5, 'CNDur': 210.0}
0.000000 1.000000 -2.000000
0.001000 2.000000 -2.000000
0.002000 3.000000 -2.000000
{'Points': 2, 'GapMode': False}
0.000000 0.500000 0.000000
0.000500 0.500000 0.000000
";

    #[test]
    fn parses_trials_in_volts() {
        let rec = Recording::parse(SAMPLE).unwrap();
        assert_eq!(rec.header.gap_list, vec![true, false]);
        assert_eq!(rec.trials.len(), 2);
        assert!(!rec.truncated);

        let t0 = &rec.trials[0];
        assert!(t0.info.is_gap);
        assert_eq!(t0.info.iti_s, 19.5);
        assert_eq!(t0.sample_rate, 1000.0);
        assert_eq!(t0.channel1, vec![0.001, 0.002, 0.003]);
        assert_eq!(t0.channel2, vec![-0.002; 3]);
        assert_eq!(rec.onset_ms(t0), 330.0);
    }

    #[test]
    fn falls_back_to_header_and_time_column() {
        let rec = Recording::parse(SAMPLE).unwrap();
        let t1 = &rec.trials[1];
        assert_eq!(t1.info.conditioning_ms, 200.0);
        assert!((t1.sample_rate - 2000.0).abs() < 1e-9);
        assert_eq!(t1.info.output_sample_rate, None);
    }

    #[test]
    fn truncated_final_trial_is_dropped() {
        let cut = SAMPLE.rfind("0.000500").unwrap();
        let rec = Recording::parse(&SAMPLE[..cut]).unwrap();
        assert!(rec.truncated);
        assert_eq!(rec.trials.len(), 1);

        // Half-written last line
        let rec = Recording::parse(&SAMPLE[..cut + 5]).unwrap();
        assert!(rec.truncated);
        assert_eq!(rec.trials.len(), 1);
    }

    #[test]
    fn file_ending_inside_trial_header_is_truncation() {
        let cut = SAMPLE.rfind("{'Points': 2").unwrap();
        let rec = Recording::parse(&SAMPLE[..cut + 15]).unwrap();
        assert!(rec.truncated);
        assert_eq!(rec.trials.len(), 1);

        // The same broken header followed by data is corruption
        let bad = SAMPLE.replacen("{'Points': 2, 'GapMode': False}", "{'Points': 2, 'GapMo", 1);
        match Recording::parse(&bad) {
            Err(Error::MalformedRecording { line, .. }) => assert_eq!(line, 7),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn corrupt_data_reports_line() {
        let bad = SAMPLE.replacen("0.001000 2.000000", "0.001000 two", 1);
        match Recording::parse(&bad) {
            Err(Error::MalformedRecording { line, .. }) => assert_eq!(line, 5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn structural_errors() {
        assert!(matches!(Recording::parse(""), Err(Error::MalformedRecording { line: 1, .. })));
        assert!(matches!(
            Recording::parse("{'CN_Dur': 1}\n{'Gaps': []}\n"),
            Err(Error::MalformedRecording { line: 2, .. })
        ));
        assert!(matches!(
            Recording::parse("{}\n{'GapList': []}\n{'GapMode': True}\n"),
            Err(Error::MalformedRecording { line: 3, .. })
        ));
    }

    #[test]
    fn header_only_recording_has_no_trials() {
        let rec = Recording::parse("{'CN_Dur': 1.0}\n").unwrap();
        assert!(rec.trials.is_empty());
        assert!(rec.header.gap_list.is_empty());
    }

    #[test]
    fn header_roundtrips_config() {
        let mut config = ExperimentConfig::new("run");
        config.conditioning.mode = StimulusMode::Tone;
        config.prepulse.mode = StimulusMode::BandpassNoise;
        config.trials.count = 24;
        config.trials.habituation = 3;
        config.analysis.lowpass_hz = 800.0;
        config.prepulse.gap = false;

        let header = RecordingHeader::from_config(&config, vec![false, true]);
        let text = header.params.to_string();
        let parsed = RecordingHeader {
            params: PyDict::parse(&text).unwrap(),
            gap_list: vec![],
        };
        let back = parsed.to_config("run");
        assert_eq!(back.conditioning, config.conditioning);
        assert_eq!(back.prepulse, config.prepulse);
        assert_eq!(back.startle.pre_duration_ms, config.startle.pre_duration_ms);
        assert_eq!(back.trials, config.trials);
        assert_eq!(back.analysis.lowpass_hz, 800.0);
    }
}
