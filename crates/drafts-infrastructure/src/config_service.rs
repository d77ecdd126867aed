//! Configuration service implementation.
//!
//! Loads the root configuration from `~/.config/drafts/config.toml` and resolves the
//! history directory from (in order) an explicit override, the `DRAFTS_HISTORY_DIR`
//! environment variable, the configuration file, and the platform default.

use crate::paths::DraftsPaths;
use drafts_core::config::{RootConfig, StoreConfig};
use drafts_core::error::{DraftsError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Environment variable overriding the history directory.
pub const HISTORY_DIR_ENV: &str = "DRAFTS_HISTORY_DIR";

/// Configuration service that loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    /// Creates a service reading the configuration at `path`.
    ///
    /// The configuration is loaded lazily on first access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service for the platform configuration file.
    pub fn default_location() -> Result<Self> {
        let path = DraftsPaths::config_file()
            .map_err(|e| DraftsError::config(format!("Failed to get config file path: {}", e)))?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the root configuration, loading from file if not cached.
    ///
    /// A missing or empty file yields the defaults; an unparsable file is an error.
    pub fn get_config(&self) -> Result<RootConfig> {
        // Check if already cached
        {
            let read_lock = self
                .config
                .read()
                .map_err(|_| DraftsError::internal("config cache lock poisoned"))?;
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = Self::load_config(&self.path)?;

        // Cache it
        {
            let mut write_lock = self
                .config
                .write()
                .map_err(|_| DraftsError::internal("config cache lock poisoned"))?;
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = None;
        }
    }

    fn load_config(path: &Path) -> Result<RootConfig> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {:?}, using defaults", path);
                return Ok(RootConfig::default());
            }
            Err(e) => {
                return Err(DraftsError::config(format!(
                    "Failed to read config file at {:?}: {}",
                    path, e
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(RootConfig::default());
        }

        toml::from_str(&content).map_err(|e| {
            DraftsError::config(format!("Failed to parse config file at {:?}: {}", path, e))
        })
    }

    /// Resolves the history directory for `store`.
    ///
    /// Precedence: `override_dir`, then `DRAFTS_HISTORY_DIR`, then `store.history_dir`,
    /// then the platform default.
    pub fn resolve_history_dir(
        store: &StoreConfig,
        override_dir: Option<PathBuf>,
    ) -> Result<PathBuf> {
        let from_env = std::env::var_os(HISTORY_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self::pick_history_dir(store, override_dir, from_env)
    }

    fn pick_history_dir(
        store: &StoreConfig,
        override_dir: Option<PathBuf>,
        from_env: Option<PathBuf>,
    ) -> Result<PathBuf> {
        if let Some(dir) = override_dir.or(from_env).or_else(|| store.history_dir.clone()) {
            return Ok(dir);
        }
        DraftsPaths::default_history_dir()
            .map_err(|e| DraftsError::config(format!("Failed to get history directory: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path().join("config.toml"));
        assert_eq!(service.get_config().unwrap(), RootConfig::default());
    }

    #[test]
    fn test_loads_and_caches() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[store]\nhistory_dir = \"/srv/history\"\npreview_chars = 60\ndurable_writes = false\n",
        )
        .unwrap();

        let service = ConfigService::new(&path);
        let config = service.get_config().unwrap();
        assert_eq!(config.store.history_dir, Some(PathBuf::from("/srv/history")));
        assert_eq!(config.store.preview_chars, 60);
        assert!(!config.store.durable_writes);

        // Cached until invalidated
        std::fs::write(&path, "[store]\npreview_chars = 10\n").unwrap();
        assert_eq!(service.get_config().unwrap().store.preview_chars, 60);
        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().store.preview_chars, 10);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[store\npreview_chars = ").unwrap();

        let err = ConfigService::new(&path).get_config().unwrap_err();
        assert!(matches!(err, DraftsError::Config(_)));
    }

    #[test]
    fn test_history_dir_precedence() {
        let store = StoreConfig {
            history_dir: Some(PathBuf::from("/from/config")),
            ..StoreConfig::default()
        };

        let dir = ConfigService::pick_history_dir(
            &store,
            Some(PathBuf::from("/from/flag")),
            Some(PathBuf::from("/from/env")),
        )
        .unwrap();
        assert_eq!(dir, PathBuf::from("/from/flag"));

        let dir = ConfigService::pick_history_dir(&store, None, Some(PathBuf::from("/from/env")))
            .unwrap();
        assert_eq!(dir, PathBuf::from("/from/env"));

        let dir = ConfigService::pick_history_dir(&store, None, None).unwrap();
        assert_eq!(dir, PathBuf::from("/from/config"));
    }
}
