use anyhow::{Context, Result, bail};
use drafts_application::{HistoryOptions, HistoryService};
use drafts_core::session::SessionRef;
use drafts_infrastructure::{ConfigService, FsRecordStore};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Opens the history directory selected by flag, environment, or config file.
pub async fn open_history(
    config_path: Option<PathBuf>,
    history_dir: Option<PathBuf>,
) -> Result<HistoryService> {
    let config_service = match config_path {
        Some(path) => ConfigService::new(path),
        None => ConfigService::default_location().context("Failed to locate config file")?,
    };
    let config = config_service.get_config().with_context(|| {
        format!(
            "Failed to load configuration from {}",
            config_service.path().display()
        )
    })?;

    let dir = ConfigService::resolve_history_dir(&config.store, history_dir)
        .context("Failed to resolve history directory")?;
    tracing::debug!("Using history directory {}", dir.display());

    let store = FsRecordStore::new(&dir)
        .await
        .with_context(|| format!("Failed to open history directory {}", dir.display()))?
        .with_durability(config.store.durable_writes);

    Ok(HistoryService::with_options(
        Arc::new(store),
        HistoryOptions::from(&config.store),
    ))
}

/// Resolves a command line session argument, failing if nothing matches.
pub async fn resolve_session(history: &HistoryService, raw: &str) -> Result<SessionRef> {
    match history
        .resolve_ref(raw)
        .await
        .with_context(|| format!("Failed to resolve session '{}'", raw))?
    {
        Some(reference) => Ok(reference),
        None => bail!("Session not found: {}", raw),
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", json);
    Ok(())
}
