//! Offline recording analysis command.

use super::common::trial_progress;
use clap::Args;
use startle_analysis::{AnalysisReport, OfflineAnalysis, TrialVerdict};
use startle_config::ExperimentConfig;
use startle_io::read_recording;
use std::path::PathBuf;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Recording file
    #[arg(value_name = "RECORDING")]
    recording: PathBuf,

    /// Analysis parameters (default: the parameters stored in the recording)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the full report as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write the averaged gap and no-gap responses as CSV
    #[arg(long)]
    averages: Option<PathBuf>,
}

pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    println!("Reading {}...", args.recording.display());
    let recording = read_recording(&args.recording)?;
    if recording.trials.is_empty() {
        anyhow::bail!("{} holds no complete trials", args.recording.display());
    }
    if recording.truncated {
        println!("  Warning: final trial was incomplete and has been skipped");
    }

    let config = match &args.config {
        Some(path) => ExperimentConfig::load(path)?,
        None => {
            let name = args
                .recording
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            recording.header.to_config(name)
        }
    };
    let settings = config.analysis_settings();
    println!(
        "  {} trials at {:.2} Hz, window {}+{} ms, band {}-{} Hz",
        recording.trials.len(),
        recording.trials[0].sample_rate,
        settings.start_ms,
        settings.duration_ms,
        settings.highpass_hz,
        settings.lowpass_hz
    );

    let traces = recording.trial_traces();
    let pb = trial_progress(traces.len());
    let report = OfflineAnalysis::new(settings).run_with(&traces, |_| pb.inc(1))?;
    pb.finish_and_clear();

    print_report(&report);

    if let Some(path) = &args.json {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("\nReport saved to {}", path.display());
    }

    if let Some(path) = &args.averages {
        let mut csv = String::from("time_ms,gap,no_gap\n");
        for (i, t) in report.time_ms.iter().enumerate() {
            let gap = report.gap_average.get(i).copied().unwrap_or(0.0);
            let no_gap = report.no_gap_average.get(i).copied().unwrap_or(0.0);
            csv.push_str(&format!("{},{},{}\n", t, gap, no_gap));
        }
        std::fs::write(path, csv)?;
        println!("Averages saved to {}", path.display());
    }

    Ok(())
}

fn print_report(report: &AnalysisReport) {
    println!("\nTrials:");
    for (label, verdict) in [
        ("accepted", TrialVerdict::Accepted),
        ("habituation", TrialVerdict::Habituation),
        ("excluded", TrialVerdict::Excluded),
        ("noisy baseline", TrialVerdict::BaselineTooNoisy),
        ("too large", TrialVerdict::SignalTooLarge),
        ("too small", TrialVerdict::SignalTooSmall),
        ("truncated", TrialVerdict::Truncated),
    ] {
        let n = report.count(verdict);
        if n > 0 {
            println!("  {:<15} {}", label, n);
        }
    }

    let s = &report.statistics;
    println!("\nResponses:");
    println!("  Gap:    n={:3}  mean={:.6}  std={:.6}", s.gap.count(), s.gap.mean, s.gap.std);
    println!(
        "  No gap: n={:3}  mean={:.6}  std={:.6}",
        s.no_gap.count(),
        s.no_gap.mean,
        s.no_gap.std
    );
    println!(
        "  Baseline std {:.6}, window std {:.6}",
        report.mean_baseline_std, report.mean_signal_std
    );
    println!(
        "  d' = {:.4}, ratio = {:.4}",
        report.discriminability.dprime, report.discriminability.ratio
    );
}
