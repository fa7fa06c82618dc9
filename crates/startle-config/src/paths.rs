//! Platform-specific locations for parameter files and recordings.
//!
//! - **User config**: `~/.config/startle/` (Linux), `~/Library/Application Support/startle/` (macOS), `%APPDATA%\startle\` (Windows)
//! - **Recordings**: `~/startle/recordings/` under the user's home directory

use std::path::{Path, PathBuf};

const APP_NAME: &str = "startle";

/// File name of the default experiment configuration.
pub const DEFAULT_CONFIG_FILE: &str = "experiment.toml";

/// The user-specific configuration directory.
///
/// Falls back to the current directory if the platform directory cannot be
/// determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the default experiment configuration.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(DEFAULT_CONFIG_FILE)
}

/// Directory where new recordings go.
pub fn recordings_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join("recordings")
}

/// Timestamped recording name inside `dir`, e.g. `201203141530_Startle.txt`.
pub fn timestamped_recording(dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M");
    dir.join(format!("{stamp}_Startle.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_under_app_dir() {
        let path = default_config_path();
        assert!(path.ends_with("startle/experiment.toml"), "{}", path.display());
    }

    #[test]
    fn recording_name_format() {
        let path = timestamped_recording(Path::new("/data"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("_Startle.txt"));
        assert_eq!(name.len(), 12 + "_Startle.txt".len());
        assert!(name[..12].chars().all(|c| c.is_ascii_digit()));
        assert!(path.starts_with("/data"));
    }
}
