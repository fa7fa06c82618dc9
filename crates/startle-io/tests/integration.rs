//! Integration tests for startle-io: a simulated run recorded to disk, read
//! back, and analyzed offline.

use startle_analysis::{OfflineAnalysis, TrialVerdict};
use startle_config::ExperimentConfig;
use startle_io::{
    Capture, ExperimentSession, RecordingHeader, RecordingWriter, SimulatedChamber, TrialInfo,
    WavSpec, read_recording, read_wav, write_wav_stereo,
};
use tempfile::TempDir;

fn run_config() -> ExperimentConfig {
    let mut config = ExperimentConfig::new("simulated");
    config.trials.count = 12;
    config.trials.iti_s = 1.0;
    config.trials.iti_variation_s = 0.0;
    config.hardware.post_duration_s = 0.15;
    config
}

// ---------------------------------------------------------------------------
// Session -> recording -> offline analysis
// ---------------------------------------------------------------------------

#[test]
fn simulated_run_records_and_reanalyzes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("runs").join("mouse1_Startle.txt");
    let config = run_config();

    let mut session = ExperimentSession::from_config(&config, SimulatedChamber::seeded(11), 11)
        .unwrap()
        .with_recording(&path)
        .unwrap();
    let mut results = Vec::new();
    while let Some(r) = session.next_trial().unwrap() {
        results.push(r);
    }
    assert_eq!(results.len(), 12);

    let online = session.statistics();
    assert!(online.gap.mean < online.no_gap.mean, "{online:?}");
    assert!(session.discriminability().dprime > 0.0);

    let recording = read_recording(&path).unwrap();
    assert!(!recording.truncated);
    assert_eq!(recording.trials.len(), 12);
    assert_eq!(recording.header.gap_list, session.plan().gap_list());
    for (trial, result) in recording.trials.iter().zip(&results) {
        assert_eq!(trial.info.is_gap, result.is_gap);
        assert_eq!(trial.channel1.len(), result.capture.len());
        assert!((recording.onset_ms(trial) - result.onset_ms).abs() < 1e-9);
    }

    let restored = recording.header.to_config("simulated");
    assert_eq!(restored.trials, config.trials);
    assert_eq!(restored.analysis.lowpass_hz, config.analysis.lowpass_hz);

    let report = OfflineAnalysis::new(restored.analysis_settings())
        .run(&recording.trial_traces())
        .unwrap();
    assert_eq!(report.trials.len(), 12);
    assert_eq!(report.count(TrialVerdict::Truncated), 0);
    assert!(report.statistics.gap.mean < report.statistics.no_gap.mean);
}

#[test]
fn interrupted_run_keeps_finished_trials() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("partial.txt");
    let config = run_config();

    let mut session = ExperimentSession::from_config(&config, SimulatedChamber::seeded(3), 3)
        .unwrap()
        .with_recording(&path)
        .unwrap();
    session.next_trial().unwrap();
    session.next_trial().unwrap();
    session.stop();
    assert!(session.next_trial().unwrap().is_none());
    drop(session);

    let recording = read_recording(&path).unwrap();
    assert_eq!(recording.trials.len(), 2);
    assert_eq!(recording.header.gap_list.len(), 12);
}

// ---------------------------------------------------------------------------
// Recording writer
// ---------------------------------------------------------------------------

#[test]
fn writer_stores_millivolts_with_six_decimals() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hand.txt");
    let header = RecordingHeader::from_config(&ExperimentConfig::default(), vec![true]);

    let mut writer = RecordingWriter::create(&path, &header).unwrap();
    let capture = Capture {
        channel1: vec![0.0012345678, -0.5],
        channel2: vec![1.25, 0.0],
        sample_rate: 1000.0,
        clipped: false,
    };
    let info = TrialInfo {
        is_gap: true,
        iti_s: 18.5,
        conditioning_ms: 190.0,
        output_sample_rate: Some(100_000.0),
    };
    writer.append(&info, &capture).unwrap();
    assert_eq!(writer.trials_written(), 1);
    drop(writer);

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("{'GapList': [True]}"));
    assert!(lines[2].contains("'Points': 2"));
    assert!(lines[2].contains("'CNDur': 190.0"));
    assert_eq!(lines[3], "0.000000 1.234568 1250.000000");
    assert_eq!(lines[4], "0.001000 -500.000000 0.000000");

    let recording = read_recording(&path).unwrap();
    let trial = &recording.trials[0];
    assert_eq!(trial.info, info);
    assert!((trial.channel1[0] - 0.001234568).abs() < 1e-12);
    assert_eq!(trial.channel2[0], 1.25);
}

#[test]
fn truncated_file_drops_last_trial() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cut.txt");
    let header = RecordingHeader::from_config(&ExperimentConfig::default(), vec![false, true]);
    let mut writer = RecordingWriter::create(&path, &header).unwrap();
    let capture = Capture {
        channel1: vec![0.1; 50],
        channel2: vec![0.0; 50],
        sample_rate: 1000.0,
        clipped: false,
    };
    let info = TrialInfo {
        is_gap: false,
        iti_s: 20.0,
        conditioning_ms: 200.0,
        output_sample_rate: None,
    };
    writer.append(&info, &capture).unwrap();
    writer.append(&TrialInfo { is_gap: true, ..info }, &capture).unwrap();
    drop(writer);

    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, &text[..text.len() - 200]).unwrap();

    let recording = read_recording(&path).unwrap();
    assert!(recording.truncated);
    assert_eq!(recording.trials.len(), 1);
    assert!(!recording.trials[0].info.is_gap);

    // Cut part-way through the second trial's header line
    let second = text.rfind("{'Points'").unwrap();
    std::fs::write(&path, &text[..second + 20]).unwrap();
    let recording = read_recording(&path).unwrap();
    assert!(recording.truncated);
    assert_eq!(recording.trials.len(), 1);
    assert_eq!(recording.trials[0].channel1.len(), 50);
}

// ---------------------------------------------------------------------------
// WAV export
// ---------------------------------------------------------------------------

#[test]
fn trial_stimulus_exports_to_stereo_wav() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trial.wav");
    let config = run_config();
    let mut session = ExperimentSession::from_config(&config, SimulatedChamber::seeded(2), 2).unwrap();
    let trial = session.next_trial().unwrap().unwrap();

    let left = &trial.stimulus.left;
    write_wav_stereo(
        &path,
        left.samples(),
        trial.stimulus.right.samples(),
        WavSpec::float(2, left.sample_rate()),
    )
    .unwrap();

    let (mixed, spec) = read_wav(&path).unwrap();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 100_000);
    assert_eq!(mixed.len(), left.len());
}
