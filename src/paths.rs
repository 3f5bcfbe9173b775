//! Application folder layout
//!
//! Every file the server reads or writes lives under a single data folder.
//! `AppPaths` derives the individual locations from it so that the daemon,
//! the HTTP API and the tests all agree on where things are.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::Result;

/// Name of the data folder created under the platform data directory
pub const DATA_FOLDER_NAME: &str = "Shabad OS";

/// Resolved locations of the server's files and folders
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Root data folder
    pub data_dir: PathBuf,
    /// Persisted global settings
    pub settings_file: PathBuf,
    /// History CSV for this process run
    pub history_file: PathBuf,
    /// Log folder (one file per process run)
    pub log_dir: PathBuf,
    /// Log file for this process run
    pub log_file: PathBuf,
    /// Themes shipped with the application
    pub bundled_themes_dir: PathBuf,
    /// User presenter themes
    pub user_presenter_themes_dir: PathBuf,
    /// User overlay themes
    pub user_overlay_themes_dir: PathBuf,
}

impl AppPaths {
    /// Build the layout under `data_dir`, naming per-run files after `started_at`.
    pub fn new(data_dir: PathBuf, started_at: DateTime<Utc>) -> Self {
        let run_name = run_file_stem(started_at);
        let history_dir = data_dir.join("history");
        let log_dir = data_dir.join("logs");
        let themes_dir = data_dir.join("themes");

        Self {
            settings_file: data_dir.join("settings.json"),
            history_file: history_dir.join(format!("{}.csv", run_name)),
            log_file: log_dir.join(format!("{}.log", run_name)),
            log_dir,
            bundled_themes_dir: themes_dir.join("bundled"),
            user_presenter_themes_dir: themes_dir.join("presenter"),
            user_overlay_themes_dir: themes_dir.join("overlay"),
            data_dir,
        }
    }

    /// Override the bundled themes location
    pub fn with_bundled_themes(mut self, dir: PathBuf) -> Self {
        self.bundled_themes_dir = dir;
        self
    }

    /// Bundled presenter themes
    pub fn bundled_presenter_themes_dir(&self) -> PathBuf {
        self.bundled_themes_dir.join("presenter")
    }

    /// Bundled overlay themes
    pub fn bundled_overlay_themes_dir(&self) -> PathBuf {
        self.bundled_themes_dir.join("overlay")
    }

    /// Create every folder the server writes into.
    pub fn ensure_app_folders(&self) -> Result<()> {
        let folders: [&Path; 4] = [
            &self.log_dir,
            &self.user_presenter_themes_dir,
            &self.user_overlay_themes_dir,
            self.history_file.parent().unwrap_or(&self.data_dir),
        ];

        std::fs::create_dir_all(&self.data_dir)?;
        for folder in folders {
            std::fs::create_dir_all(folder)?;
        }
        Ok(())
    }
}

/// Default data folder: `<platform data dir>/Shabad OS`, or the working
/// directory when the platform has no data directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_FOLDER_NAME)
}

/// File-name-safe timestamp, e.g. `2024-03-01_10-22-05.123Z`
fn run_file_stem(started_at: DateTime<Utc>) -> String {
    started_at
        .format("%Y-%m-%d_%H-%M-%S%.3fZ")
        .to_string()
}
