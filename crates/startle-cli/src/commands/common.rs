//! Shared CLI helpers used across multiple commands.

use indicatif::{ProgressBar, ProgressStyle};
use startle_config::{ExperimentConfig, paths};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Load an experiment configuration.
///
/// Searches in this order:
/// 1. The explicit `--config` path
/// 2. The user's default configuration file
/// 3. Built-in defaults
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ExperimentConfig> {
    if let Some(path) = path {
        return ExperimentConfig::load(path).map_err(|e| anyhow::anyhow!("{}", e));
    }

    let default = paths::default_config_path();
    if default.exists() {
        tracing::info!(path = %default.display(), "using default configuration");
        return ExperimentConfig::load(&default).map_err(|e| anyhow::anyhow!("{}", e));
    }

    Ok(ExperimentConfig::default())
}

/// Progress bar counting trials.
pub fn trial_progress(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("##-"),
    );
    pb
}

/// Install a Ctrl+C handler that sets the returned stop flag.
pub fn stop_on_ctrlc() -> anyhow::Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let s = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        eprintln!("\nStopping after the current trial...");
        s.store(true, Ordering::SeqCst);
    })?;
    Ok(stop)
}
