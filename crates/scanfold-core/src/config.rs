// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration and its on-disk persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::ScanSettings;

/// Name of the settings file inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where assembled PDFs are written. Relative paths resolve against the
    /// working directory.
    pub output_dir: PathBuf,
    /// Folder watched during manual handoff.
    pub drop_folder: PathBuf,
    /// Parent of the per-session scratch directories.
    pub scratch_root: PathBuf,
    /// Settings preselected in both front ends.
    pub default_settings: ScanSettings,
    /// Upper bound for the host device query.
    pub enumerate_timeout_secs: u64,
    /// Upper bound for one native capture command.
    pub capture_timeout_secs: u64,
    /// Upper bound for the automation script.
    pub automation_timeout_secs: u64,
    /// How long manual handoff waits for a new file.
    pub handoff_timeout_secs: u64,
    /// Poll period while waiting for a handoff file.
    pub handoff_poll_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("scans"),
            drop_folder: home_dir().join("Desktop"),
            scratch_root: std::env::temp_dir(),
            default_settings: ScanSettings::default(),
            enumerate_timeout_secs: 5,
            capture_timeout_secs: 30,
            automation_timeout_secs: 30,
            handoff_timeout_secs: 30,
            handoff_poll_interval_ms: 1000,
        }
    }
}

impl AppConfig {
    pub fn enumerate_timeout(&self) -> Duration {
        Duration::from_secs(self.enumerate_timeout_secs)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs)
    }

    pub fn automation_timeout(&self) -> Duration {
        Duration::from_secs(self.automation_timeout_secs)
    }

    pub fn handoff_timeout(&self) -> Duration {
        Duration::from_secs(self.handoff_timeout_secs)
    }

    pub fn handoff_poll_interval(&self) -> Duration {
        Duration::from_millis(self.handoff_poll_interval_ms.max(1))
    }

    /// Load settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(config) => {
                    debug!(path = %path.display(), "config loaded");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Write settings to `path` as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Return the application data directory (not created).
///
/// `$XDG_DATA_HOME/scanfold`, else `~/.local/share/scanfold`.
pub fn data_dir() -> PathBuf {
    let base = match std::env::var_os("XDG_DATA_HOME") {
        Some(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => home_dir().join(".local").join("share"),
    };
    base.join("scanfold")
}

/// Default location of the settings file.
pub fn default_config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE)
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorMode, Resolution};

    #[test]
    fn defaults_match_documented_bounds() {
        let config = AppConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("scans"));
        assert_eq!(config.enumerate_timeout(), Duration::from_secs(5));
        assert_eq!(config.handoff_timeout(), Duration::from_secs(30));
        assert_eq!(config.handoff_poll_interval(), Duration::from_secs(1));
        assert_eq!(config.default_settings.resolution, Resolution::Dpi300);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = AppConfig::default();
        config.default_settings.color_mode = ColorMode::Gray;
        config.handoff_timeout_secs = 12;
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load_or_default(&path), config);
    }

    #[test]
    fn missing_or_garbled_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert_eq!(AppConfig::load_or_default(&missing), AppConfig::default());

        let garbled = dir.path().join("garbled.json");
        std::fs::write(&garbled, "{ not json").unwrap();
        assert_eq!(AppConfig::load_or_default(&garbled), AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "output_dir": "/srv/scans" }"#).unwrap();

        let config = AppConfig::load_or_default(&path);
        assert_eq!(config.output_dir, PathBuf::from("/srv/scans"));
        assert_eq!(config.capture_timeout_secs, 30);
    }
}
