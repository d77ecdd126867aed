use super::bootstrap::{print_json, resolve_session};
use anyhow::{Context, Result};
use drafts_application::HistoryService;
use serde_json::json;
use std::path::Path;
use tokio::io::AsyncReadExt;

pub async fn begin(history: &HistoryService, raw: &str, count: usize) -> Result<()> {
    let reference = resolve_session(history, raw).await?;
    history
        .begin_variants(&reference, count)
        .await
        .with_context(|| format!("Failed to reserve variants of {}", reference))?;
    print_json(&json!({ "ref": reference, "variants": count }))
}

pub async fn append_thought(
    history: &HistoryService,
    raw: &str,
    index: usize,
    chunk: &str,
) -> Result<()> {
    let reference = resolve_session(history, raw).await?;
    history
        .append_thought(&reference, index, chunk)
        .await
        .with_context(|| format!("Failed to append to variant {} of {}", index, reference))?;
    print_json(&json!({ "ref": reference, "index": index }))
}

pub async fn save_code(
    history: &HistoryService,
    raw: &str,
    index: usize,
    file: Option<&Path>,
) -> Result<()> {
    let reference = resolve_session(history, raw).await?;
    let code = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut code = String::new();
            tokio::io::stdin()
                .read_to_string(&mut code)
                .await
                .context("Failed to read code from stdin")?;
            code
        }
    };

    history
        .save_code(&reference, index, &code)
        .await
        .with_context(|| format!("Failed to save code of variant {} of {}", index, reference))?;
    print_json(&json!({ "ref": reference, "index": index }))
}

pub async fn latest_thought(history: &HistoryService) -> Result<()> {
    let thought = history
        .latest_thought()
        .await
        .context("Failed to read the latest thought")?;
    print_json(&json!({ "thought": thought }))
}
