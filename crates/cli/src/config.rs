//! Saved working-directory preference.
//!
//! A small JSON file remembers the folder chosen during `--setup`. It is
//! read once at startup and passed around explicitly.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the saved configuration.
pub const CONFIG_FILE_NAME: &str = ".slides-config.json";

/// Persisted user preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Folder holding `input/`, `processed/` and `output/`.
    pub working_dir: PathBuf,
}

impl AppConfig {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    /// Load a saved config. A missing or unreadable file counts as no config.
    pub fn load(path: &Path) -> Option<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                log::debug!("No saved config at {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Ignoring invalid config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }
}

/// Directory containing the running executable, or the current directory.
pub fn app_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default location of the config file, next to the executable.
pub fn default_config_path() -> PathBuf {
    app_dir().join(CONFIG_FILE_NAME)
}

/// Pick the working directory.
///
/// An explicit `--dir` always wins. Otherwise a saved directory is used if
/// it still exists, falling back to the current directory.
pub fn resolve_working_dir(cli_dir: Option<&Path>, saved: Option<&AppConfig>) -> Result<PathBuf> {
    if let Some(dir) = cli_dir {
        return std::path::absolute(dir)
            .with_context(|| format!("Invalid working directory: {}", dir.display()));
    }

    if let Some(config) = saved {
        if config.working_dir.is_dir() {
            return Ok(config.working_dir.clone());
        }
        log::warn!(
            "Saved working directory {} no longer exists",
            config.working_dir.display()
        );
    }

    std::env::current_dir().context("Failed to determine current directory")
}
