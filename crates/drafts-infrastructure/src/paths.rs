//! Unified path management for drafts configuration and history data.
//!
//! ```text
//! ~/.config/drafts/            # Config directory
//! └── config.toml              # Application configuration
//!
//! ~/.local/share/drafts/       # Data directory
//! └── history/                 # Session partitions
//!     └── 2026-01-28/
//!         └── 15-03-04_512254cc/
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "drafts";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for drafts.
pub struct DraftsPaths;

impl DraftsPaths {
    /// Returns the drafts configuration directory (e.g., `~/.config/drafts/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the drafts data directory (e.g., `~/.local/share/drafts/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the default history directory used when nothing is configured.
    pub fn default_history_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("history"))
    }
}
