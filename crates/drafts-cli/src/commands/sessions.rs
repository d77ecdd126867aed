use super::bootstrap::{print_json, resolve_session};
use anyhow::{Context, Result, bail};
use drafts_application::HistoryService;
use drafts_core::session::SessionMetadata;
use serde_json::{Value, json};

pub async fn list(history: &HistoryService) -> Result<()> {
    let sessions = history
        .list_sessions()
        .await
        .context("Failed to list sessions")?;
    print_json(&sessions)
}

pub async fn partitions(history: &HistoryService) -> Result<()> {
    let partitions = history
        .list_partitions()
        .await
        .context("Failed to list partitions")?;
    print_json(&partitions)
}

pub async fn show(history: &HistoryService, raw: &str) -> Result<()> {
    let reference = resolve_session(history, raw).await?;
    match history
        .get_session(&reference)
        .await
        .with_context(|| format!("Failed to load session {}", reference))?
    {
        Some(detail) => print_json(&detail),
        None => bail!("Session not found: {}", reference),
    }
}

pub async fn create(
    history: &HistoryService,
    params: Option<&str>,
    parent: Option<&str>,
) -> Result<()> {
    let params: Value = match params {
        Some(raw) => serde_json::from_str(raw).context("--params is not valid JSON")?,
        None => json!({}),
    };
    let mut metadata = SessionMetadata::from_params(params);

    if let Some(raw) = parent {
        let parent = resolve_session(history, raw).await?;
        metadata.set_parent_session_id(&parent);
    }

    let reference = history
        .create(metadata.into_value())
        .await
        .context("Failed to create session")?;
    print_json(&json!({ "ref": reference }))
}

pub async fn rename(history: &HistoryService, raw: &str, title: &str) -> Result<()> {
    let reference = resolve_session(history, raw).await?;
    if !history
        .update_title(&reference, title)
        .await
        .with_context(|| format!("Failed to rename session {}", reference))?
    {
        bail!("Session not found: {}", reference);
    }
    print_json(&json!({ "ref": reference, "title": title }))
}

pub async fn delete(history: &HistoryService, raw: &str) -> Result<()> {
    let reference = resolve_session(history, raw).await?;
    if !history
        .delete_session(&reference)
        .await
        .with_context(|| format!("Failed to delete session {}", reference))?
    {
        bail!("Session not found: {}", reference);
    }
    print_json(&json!({ "ref": reference, "deleted": true }))
}
