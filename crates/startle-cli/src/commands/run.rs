//! Simulated experiment run command.

use super::common::{load_config, stop_on_ctrlc, trial_progress};
use clap::Args;
use startle_config::paths;
use startle_io::{ExperimentSession, SimulatedChamber};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Args)]
pub struct RunArgs {
    /// Experiment configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recording file (default: timestamped file in the recordings directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed for the trial plan, the noise, and the simulated animal
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of trials
    #[arg(long)]
    trials: Option<usize>,

    /// Wait out each inter-trial interval as a live run would
    #[arg(long)]
    wait: bool,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(trials) = args.trials {
        config.trials.count = trials;
    }
    let seed = args.seed.unwrap_or_else(rand::random::<u64>);
    let output = args
        .output
        .unwrap_or_else(|| paths::timestamped_recording(&paths::recordings_dir()));

    let stop = stop_on_ctrlc()?;
    let mut session = ExperimentSession::from_config(&config, SimulatedChamber::seeded(seed), seed)?
        .with_recording(&output)?
        .with_stop_flag(Arc::clone(&stop));

    println!("Running '{}' against the simulated chamber", config.name);
    println!(
        "  {} trials ({} habituation), {} gap, seed {}",
        session.plan().len(),
        config.trials.habituation,
        session.plan().gap_list().iter().filter(|g| **g).count(),
        seed
    );
    println!("  Recording to {}", output.display());
    println!("Press Ctrl+C to stop\n");

    let pb = trial_progress(session.plan().len());
    while let Some(trial) = session.next_trial()? {
        pb.set_message(format!("d' {:.3}", trial.discriminability.dprime));
        pb.inc(1);
        if trial.capture.clipped {
            pb.println(format!("  trial {}: output clipped", trial.index));
        }
        if args.wait && !wait_interval(trial.iti_s, &stop) {
            break;
        }
    }
    pb.finish_and_clear();

    let stats = session.statistics();
    let d = session.discriminability();
    if stop.load(Ordering::SeqCst) {
        println!("Stopped by user");
    }
    println!("Completed {}/{} trials", session.trials_run(), session.plan().len());
    println!(
        "  Gap:    n={:3}  mean={:.6}  std={:.6}",
        stats.gap.count(),
        stats.gap.mean,
        stats.gap.std
    );
    println!(
        "  No gap: n={:3}  mean={:.6}  std={:.6}",
        stats.no_gap.count(),
        stats.no_gap.mean,
        stats.no_gap.std
    );
    println!("  d' = {:.4}, ratio = {:.4}", d.dprime, d.ratio);
    println!("Recording saved to {}", output.display());

    Ok(())
}

/// Sleep for `seconds`, waking early on a stop request. Returns false when
/// stopped.
fn wait_interval(seconds: f64, stop: &AtomicBool) -> bool {
    let deadline = Instant::now() + Duration::from_secs_f64(seconds.max(0.0));
    while Instant::now() < deadline {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    !stop.load(Ordering::SeqCst)
}
