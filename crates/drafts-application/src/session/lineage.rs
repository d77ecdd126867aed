//! Lineage resolution and the history list.
//!
//! Sessions point at their parent through the `parent_session_id` field of their
//! metadata. Nothing points down, so every walk goes from a session towards its root
//! and the list projection derives "is a parent" from the set of referenced keys.

use super::metadata::MetadataStore;
use super::variants::VariantStore;
use drafts_core::config::DEFAULT_PREVIEW_CHARS;
use drafts_core::error::{DraftsError, Result};
use drafts_core::session::{
    ParentRef, SessionDetail, SessionMetadata, SessionRef, SessionSummary, StackEntry, Variant,
};
use drafts_core::storage::{RecordKey, RecordStore};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;

/// Concurrent metadata reads during a list scan.
const SCAN_CONCURRENCY: usize = 32;

/// Builds list and detail views over the stored sessions.
#[derive(Clone)]
pub struct LineageResolver {
    store: Arc<dyn RecordStore>,
    metadata: MetadataStore,
    variants: VariantStore,
    preview_chars: usize,
}

impl LineageResolver {
    pub fn new(
        store: Arc<dyn RecordStore>,
        metadata: MetadataStore,
        variants: VariantStore,
    ) -> Self {
        Self {
            store,
            metadata,
            variants,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    /// Lists partitions in ascending order.
    pub async fn partitions(&self) -> Result<Vec<String>> {
        self.store.list_namespaces(&RecordKey::root()).await
    }

    /// Lists every stored session in ascending key order.
    pub async fn sessions(&self) -> Result<Vec<SessionRef>> {
        let mut sessions = Vec::new();
        for partition in self.partitions().await? {
            let partition_key = RecordKey::new([partition.as_str()])?;
            for local_id in self.store.list_namespaces(&partition_key).await? {
                sessions.push(SessionRef::new(partition.clone(), local_id)?);
            }
        }
        Ok(sessions)
    }

    /// Resolves user or metadata supplied text to a stored session.
    ///
    /// Accepts `partition/local_id` as well as a bare local id; the latter is searched
    /// in all partitions, newest first. Returns `None` when nothing matches.
    pub async fn resolve(&self, raw: &str) -> Result<Option<SessionRef>> {
        match ParentRef::parse(raw) {
            Some(ParentRef::Qualified(reference)) => {
                if self.store.contains(&reference.namespace()).await? {
                    Ok(Some(reference))
                } else {
                    Ok(None)
                }
            }
            Some(ParentRef::Bare(local_id)) => {
                for partition in self.partitions().await?.into_iter().rev() {
                    let reference = SessionRef::new(partition, local_id.as_str())?;
                    if self.store.contains(&reference.namespace()).await? {
                        return Ok(Some(reference));
                    }
                }
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Finds the title of the nearest titled ancestor, starting at `parent`.
    ///
    /// Dangling references and loops end the search without a title.
    pub async fn inherited_title(&self, parent: &str) -> Result<Option<String>> {
        let mut visited = HashSet::new();
        let mut next = Some(parent.to_string());

        while let Some(raw) = next.take() {
            let Some(ancestor) = self.resolve(&raw).await? else {
                break;
            };
            if !visited.insert(ancestor.clone()) {
                tracing::warn!("Parent chain of {} loops, not inheriting a title", parent);
                break;
            }
            let Some(metadata) = self.metadata.read(&ancestor).await else {
                break;
            };
            if let Some(title) = metadata.title() {
                return Ok(Some(title.to_string()));
            }
            next = metadata.parent_session_id().map(str::to_string);
        }
        Ok(None)
    }

    /// Loads a session together with its ancestry.
    ///
    /// Returns `Ok(None)` if the session does not exist.
    ///
    /// # Errors
    ///
    /// `LineageCycle` when following parent references revisits a session.
    pub async fn detail(&self, reference: &SessionRef) -> Result<Option<SessionDetail>> {
        if !self.store.contains(&reference.namespace()).await? {
            return Ok(None);
        }

        let params = self.metadata.read(reference).await;
        let variants = self.variants.read(reference).await?;

        let mut visited = HashSet::from([reference.clone()]);
        let mut chain = vec![reference.to_string()];
        let mut ancestors = Vec::new();
        let mut next = parent_of(params.as_ref());

        while let Some(raw) = next.take() {
            let Some(parent) = self.resolve(&raw).await? else {
                tracing::warn!("Dangling parent '{}' in lineage of {}", raw, reference);
                break;
            };
            chain.push(parent.to_string());
            if !visited.insert(parent.clone()) {
                return Err(DraftsError::LineageCycle { chain });
            }

            let parent_params = self.metadata.read(&parent).await;
            let parent_variants: Vec<Variant> = self
                .variants
                .read(&parent)
                .await?
                .iter()
                .map(Variant::without_thought)
                .collect();
            next = parent_of(parent_params.as_ref());
            ancestors.push(StackEntry::new(parent, parent_params, parent_variants));
        }

        let mut stack: Vec<StackEntry> = ancestors.into_iter().rev().collect();
        stack.push(StackEntry::new(
            reference.clone(),
            params.clone(),
            variants.clone(),
        ));

        Ok(Some(SessionDetail {
            session_ref: reference.clone(),
            params,
            variants,
            stack,
        }))
    }

    /// Projects the stored sessions onto the leaves of their lineage chains, newest first.
    pub async fn list(&self) -> Result<Vec<SessionSummary>> {
        let sessions = self.sessions().await?;

        let loaded: Vec<(SessionRef, Option<SessionMetadata>)> = stream::iter(sessions)
            .map(|reference| async move {
                let metadata = self.metadata.read(&reference).await;
                (reference, metadata)
            })
            .buffered(SCAN_CONCURRENCY)
            .collect()
            .await;

        let entries: Vec<(SessionRef, SessionMetadata)> = loaded
            .into_iter()
            .filter_map(|(reference, metadata)| match metadata {
                Some(metadata) => Some((reference, metadata)),
                None => {
                    tracing::debug!("Skipping {} without readable metadata", reference);
                    None
                }
            })
            .collect();

        let mut parents = HashSet::new();
        let mut bare_parents = HashSet::new();
        for (_, metadata) in &entries {
            match metadata.parent_session_id().and_then(ParentRef::parse) {
                Some(ParentRef::Qualified(parent)) => {
                    parents.insert(parent);
                }
                Some(ParentRef::Bare(local_id)) => {
                    bare_parents.insert(local_id);
                }
                None => {}
            }
        }

        let mut leaves: Vec<(SessionRef, SessionMetadata)> = entries
            .into_iter()
            .filter(|(reference, _)| {
                !parents.contains(reference) && !bare_parents.contains(reference.local_id())
            })
            .collect();
        leaves.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(leaves
            .into_iter()
            .map(|(reference, metadata)| self.summarize(reference, &metadata))
            .collect())
    }

    /// Returns the variant 0 trace of the most recent session.
    pub async fn latest_thought(&self) -> Result<Option<String>> {
        for partition in self.partitions().await?.into_iter().rev() {
            let partition_key = RecordKey::new([partition.as_str()])?;
            let Some(local_id) = self.store.list_namespaces(&partition_key).await?.pop() else {
                continue;
            };
            let latest = SessionRef::new(partition, local_id)?;
            return self.variants.read_thought(&latest, 0).await;
        }
        Ok(None)
    }

    fn summarize(&self, reference: SessionRef, metadata: &SessionMetadata) -> SessionSummary {
        SessionSummary {
            id: reference.local_id().to_string(),
            date: reference.partition().to_string(),
            timestamp: reference.timestamp().to_string(),
            prompt: preview(metadata, self.preview_chars),
            input_mode: metadata.input_mode().to_string(),
            url: format!("/history/{}/{}", reference.partition(), reference.local_id()),
            parent_session_id: metadata.parent_session_id().map(str::to_string),
            title: metadata.title().map(str::to_string),
            session_ref: reference,
        }
    }
}

fn parent_of(metadata: Option<&SessionMetadata>) -> Option<String> {
    metadata
        .and_then(SessionMetadata::parent_session_id)
        .map(str::to_string)
}

/// The title when set, otherwise the prompt cut to `max_chars` characters.
fn preview(metadata: &SessionMetadata, max_chars: usize) -> String {
    if let Some(title) = metadata.title() {
        return title.to_string();
    }
    let text = metadata.prompt_text();
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drafts_infrastructure::MemoryRecordStore;
    use serde_json::json;

    struct Fixture {
        store: Arc<MemoryRecordStore>,
        metadata: MetadataStore,
        variants: VariantStore,
        lineage: LineageResolver,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryRecordStore::new());
            let metadata = MetadataStore::new(store.clone());
            let variants = VariantStore::new(store.clone());
            let lineage = LineageResolver::new(store.clone(), metadata.clone(), variants.clone());
            Self {
                store,
                metadata,
                variants,
                lineage,
            }
        }

        async fn session(&self, raw: &str, params: serde_json::Value) -> SessionRef {
            let reference: SessionRef = raw.parse().unwrap();
            self.store
                .create_namespace(&reference.namespace())
                .await
                .unwrap();
            self.metadata
                .write(&reference, &SessionMetadata::from_params(params))
                .await
                .unwrap();
            reference
        }
    }

    #[test]
    fn test_preview() {
        let titled = SessionMetadata::from_params(json!({"title": "T", "prompt": "long prompt"}));
        assert_eq!(preview(&titled, 3), "T");

        let long = SessionMetadata::from_params(json!({"prompt": {"text": "héllo world"}}));
        assert_eq!(preview(&long, 5), "héllo...");
        assert_eq!(preview(&long, 11), "héllo world");
    }

    #[tokio::test]
    async fn test_resolve_qualified_and_bare() {
        let fx = Fixture::new();
        let older = fx.session("2026-01-27/09-00-00_aaaaaaaa", json!({})).await;
        let newer = fx.session("2026-01-28/09-00-00_aaaaaaaa", json!({})).await;

        assert_eq!(
            fx.lineage.resolve(&older.to_string()).await.unwrap(),
            Some(older)
        );
        assert_eq!(
            fx.lineage.resolve("09-00-00_aaaaaaaa").await.unwrap(),
            Some(newer)
        );
        assert_eq!(fx.lineage.resolve("09-00-00_bbbbbbbb").await.unwrap(), None);
        assert_eq!(fx.lineage.resolve("not a/valid/ref").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_detail_stack_is_root_first() {
        let fx = Fixture::new();
        let a = fx.session("2026-01-28/09-00-00_aaaaaaaa", json!({})).await;
        let b = fx
            .session(
                "2026-01-28/09-05-00_bbbbbbbb",
                json!({"parent_session_id": a.to_string()}),
            )
            .await;
        fx.variants.append_thought(&a, 0, "a thinks").await.unwrap();
        fx.variants.save_code(&a, 0, "<a/>").await.unwrap();
        fx.variants.append_thought(&b, 0, "b thinks").await.unwrap();

        let detail = fx.lineage.detail(&b).await.unwrap().unwrap();

        assert_eq!(detail.stack.len(), 2);
        assert_eq!(detail.stack[0].session_ref, a);
        assert_eq!(detail.stack[0].variants[0].thought, None);
        assert_eq!(detail.stack[0].variants[0].code.as_deref(), Some("<a/>"));
        assert_eq!(detail.stack[1].session_ref, b);
        assert_eq!(detail.stack[1].variants[0].thought.as_deref(), Some("b thinks"));
    }

    #[tokio::test]
    async fn test_detail_detects_cycle() {
        let fx = Fixture::new();
        let a_raw = "2026-01-28/09-00-00_aaaaaaaa";
        let b_raw = "2026-01-28/09-05-00_bbbbbbbb";
        let a = fx.session(a_raw, json!({"parent_session_id": b_raw})).await;
        fx.session(b_raw, json!({"parent_session_id": a_raw})).await;

        let err = fx.lineage.detail(&a).await.unwrap_err();
        match err {
            DraftsError::LineageCycle { chain } => {
                assert_eq!(chain, vec![a_raw, b_raw, a_raw]);
            }
            other => panic!("expected a lineage cycle, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_detail_detects_self_parent() {
        let fx = Fixture::new();
        let raw = "2026-01-28/09-00-00_aaaaaaaa";
        let a = fx.session(raw, json!({"parent_session_id": raw})).await;

        let err = fx.lineage.detail(&a).await.unwrap_err();
        match err {
            DraftsError::LineageCycle { chain } => assert_eq!(chain, vec![raw, raw]),
            other => panic!("expected a lineage cycle, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_inherited_title_stops_on_loop() {
        let fx = Fixture::new();
        let a_raw = "2026-01-28/09-00-00_aaaaaaaa";
        let b_raw = "2026-01-28/09-05-00_bbbbbbbb";
        fx.session(a_raw, json!({"parent_session_id": b_raw})).await;
        fx.session(b_raw, json!({"parent_session_id": a_raw})).await;

        assert_eq!(fx.lineage.inherited_title(a_raw).await.unwrap(), None);
        assert_eq!(fx.lineage.inherited_title(b_raw).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_detail_stops_at_dangling_parent() {
        let fx = Fixture::new();
        let b = fx
            .session(
                "2026-01-28/09-05-00_bbbbbbbb",
                json!({"parent_session_id": "2026-01-01/00-00-00_gone0000"}),
            )
            .await;

        let detail = fx.lineage.detail(&b).await.unwrap().unwrap();
        assert_eq!(detail.stack.len(), 1);
        assert_eq!(detail.stack[0].session_ref, b);
    }

    #[tokio::test]
    async fn test_inherited_title_walks_to_nearest_titled() {
        let fx = Fixture::new();
        let root = fx
            .session("2026-01-28/09-00-00_aaaaaaaa", json!({"title": "Root"}))
            .await;
        let middle = fx
            .session(
                "2026-01-28/09-05-00_bbbbbbbb",
                json!({"parent_session_id": root.to_string()}),
            )
            .await;

        assert_eq!(
            fx.lineage
                .inherited_title(&middle.to_string())
                .await
                .unwrap()
                .as_deref(),
            Some("Root")
        );
        assert_eq!(
            fx.lineage
                .inherited_title("2026-01-01/00-00-00_gone0000")
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_list_matches_bare_parents() {
        let fx = Fixture::new();
        let a = fx.session("2026-01-27/09-00-00_aaaaaaaa", json!({})).await;
        let b = fx
            .session(
                "2026-01-28/09-05-00_bbbbbbbb",
                json!({"parent_session_id": a.local_id()}),
            )
            .await;

        let list = fx.lineage.list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].session_ref, b);
        assert_eq!(list[0].url, "/history/2026-01-28/09-05-00_bbbbbbbb");
        assert_eq!(list[0].timestamp, "09-05-00");
        assert_eq!(list[0].input_mode, "unknown");
    }

    #[tokio::test]
    async fn test_latest_thought_skips_empty_partitions() {
        let fx = Fixture::new();
        assert_eq!(fx.lineage.latest_thought().await.unwrap(), None);

        let a = fx.session("2026-01-27/09-00-00_aaaaaaaa", json!({})).await;
        fx.variants.append_thought(&a, 0, "latest").await.unwrap();
        fx.store
            .create_namespace(&RecordKey::new(["2026-01-28"]).unwrap())
            .await
            .unwrap();

        assert_eq!(
            fx.lineage.latest_thought().await.unwrap().as_deref(),
            Some("latest")
        );
    }
}
