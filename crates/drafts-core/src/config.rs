//! Store configuration model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of prompt characters shown in a history preview.
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

/// Root configuration, as read from `config.toml`.
///
/// ```toml
/// [store]
/// history_dir = "/var/lib/drafts/history"
/// preview_chars = 100
/// durable_writes = true
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct RootConfig {
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Directory holding the partitions. Falls back to the platform data directory.
    #[serde(default)]
    pub history_dir: Option<PathBuf>,
    /// Prompt preview length in the history list
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    /// Flush records to disk before they become visible
    #[serde(default = "default_durable_writes")]
    pub durable_writes: bool,
}

fn default_preview_chars() -> usize {
    DEFAULT_PREVIEW_CHARS
}

fn default_durable_writes() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_dir: None,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            durable_writes: true,
        }
    }
}
