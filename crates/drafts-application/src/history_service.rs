//! History service.
//!
//! Single entry point used by producers (create, stream traces, save code) and by
//! readers (list, show, rename, delete). Every operation is scoped to one session
//! except the list scan and `latest_thought`, which read a best-effort snapshot.

use crate::session::{Clock, LineageResolver, MetadataStore, SessionAllocator, VariantStore};
use drafts_core::config::{DEFAULT_PREVIEW_CHARS, StoreConfig};
use drafts_core::error::Result;
use drafts_core::session::{SessionDetail, SessionMetadata, SessionRef, SessionSummary, Variant};
use drafts_core::storage::RecordStore;
use serde_json::Value;
use std::sync::Arc;

/// Tunables of the history service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryOptions {
    /// Prompt characters kept in list previews
    pub preview_chars: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

impl From<&StoreConfig> for HistoryOptions {
    fn from(config: &StoreConfig) -> Self {
        Self {
            preview_chars: config.preview_chars,
        }
    }
}

/// Session history over a record store.
#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn RecordStore>,
    allocator: SessionAllocator,
    metadata: MetadataStore,
    variants: VariantStore,
    lineage: LineageResolver,
}

impl HistoryService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_options(store, HistoryOptions::default())
    }

    pub fn with_options(store: Arc<dyn RecordStore>, options: HistoryOptions) -> Self {
        let metadata = MetadataStore::new(store.clone());
        let variants = VariantStore::new(store.clone());
        let lineage = LineageResolver::new(store.clone(), metadata.clone(), variants.clone())
            .with_preview_chars(options.preview_chars);
        Self {
            allocator: SessionAllocator::new(store.clone()),
            store,
            metadata,
            variants,
            lineage,
        }
    }

    /// Replaces the clock used to mint session references.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.allocator = self.allocator.with_clock(clock);
        self
    }

    /// Name of the underlying store backend.
    pub fn backend_name(&self) -> &str {
        self.store.backend_name()
    }

    /// Creates a session holding `params` as its metadata.
    ///
    /// The metadata record is written before the reference is returned. A session
    /// without its own title inherits the title of its nearest titled ancestor.
    pub async fn create(&self, params: Value) -> Result<SessionRef> {
        let mut metadata = SessionMetadata::from_params(params);

        if metadata.title().is_none()
            && let Some(parent) = metadata.parent_session_id().map(str::to_string)
        {
            match self.lineage.inherited_title(&parent).await {
                Ok(Some(title)) => {
                    tracing::debug!("Inheriting title '{}' from lineage of {}", title, parent);
                    metadata.set_title(title);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Could not look up a title in lineage of {}: {}", parent, e);
                }
            }
        }

        let reference = self.allocator.allocate().await?;
        if let Err(e) = self.metadata.write(&reference, &metadata).await {
            // Don't leave an empty session behind.
            if let Err(cleanup) = self.allocator.release(&reference).await {
                tracing::warn!("Failed to clean up session {}: {}", reference, cleanup);
            }
            return Err(e);
        }

        tracing::info!("Created session {}", reference);
        Ok(reference)
    }

    /// Reserves the traces of variants `0..count`.
    pub async fn begin_variants(&self, reference: &SessionRef, count: usize) -> Result<()> {
        self.variants.begin(reference, count).await
    }

    /// Appends a chunk to the reasoning trace of a variant.
    pub async fn append_thought(
        &self,
        reference: &SessionRef,
        index: usize,
        chunk: &str,
    ) -> Result<()> {
        self.variants.append_thought(reference, index, chunk).await
    }

    /// Replaces the generated code of a variant.
    pub async fn save_code(&self, reference: &SessionRef, index: usize, code: &str) -> Result<()> {
        self.variants.save_code(reference, index, code).await
    }

    pub async fn read_metadata(&self, reference: &SessionRef) -> Option<SessionMetadata> {
        self.metadata.read(reference).await
    }

    pub async fn write_metadata(
        &self,
        reference: &SessionRef,
        metadata: &SessionMetadata,
    ) -> Result<()> {
        self.metadata.write(reference, metadata).await
    }

    pub async fn read_variants(&self, reference: &SessionRef) -> Result<Vec<Variant>> {
        self.variants.read(reference).await
    }

    /// Loads a session with its lineage stack, or `None` if it does not exist.
    pub async fn get_session(&self, reference: &SessionRef) -> Result<Option<SessionDetail>> {
        self.lineage.detail(reference).await
    }

    /// Lists the leaf sessions, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        self.lineage.list().await
    }

    pub async fn list_partitions(&self) -> Result<Vec<String>> {
        self.lineage.partitions().await
    }

    /// Deletes a session. Children keep their (now dangling) parent reference.
    pub async fn delete_session(&self, reference: &SessionRef) -> Result<bool> {
        let deleted = self.allocator.release(reference).await?;
        if deleted {
            tracing::info!("Deleted session {}", reference);
        }
        Ok(deleted)
    }

    pub async fn update_title(&self, reference: &SessionRef, title: &str) -> Result<bool> {
        let updated = self.metadata.update_title(reference, title).await?;
        if updated {
            tracing::info!("Renamed session {} to '{}'", reference, title);
        }
        Ok(updated)
    }

    /// Variant 0 trace of the most recently created session.
    pub async fn latest_thought(&self) -> Result<Option<String>> {
        self.lineage.latest_thought().await
    }

    /// Resolves `partition/local_id` or a bare local id to a stored session.
    pub async fn resolve_ref(&self, raw: &str) -> Result<Option<SessionRef>> {
        self.lineage.resolve(raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FlakyStore;
    use chrono::NaiveDate;
    use drafts_infrastructure::MemoryRecordStore;
    use serde_json::json;

    fn service() -> HistoryService {
        HistoryService::new(Arc::new(MemoryRecordStore::new()))
    }

    #[tokio::test]
    async fn test_create_writes_metadata_before_returning() {
        let history = service();
        let reference = history
            .create(json!({"prompt": {"text": "a landing page"}, "input_mode": "text"}))
            .await
            .unwrap();

        let metadata = history.read_metadata(&reference).await.unwrap();
        assert_eq!(metadata.prompt_text(), "a landing page");
        assert_eq!(metadata.input_mode(), "text");
        assert!(history.read_variants(&reference).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_fixed_clock() {
        let clock: Clock = Arc::new(|| {
            NaiveDate::from_ymd_opt(2026, 3, 9)
                .unwrap()
                .and_hms_opt(10, 15, 22)
                .unwrap()
        });
        let history = service().with_clock(clock);

        let reference = history.create(json!({})).await.unwrap();
        assert_eq!(reference.partition(), "2026-03-09");
        assert!(reference.local_id().starts_with("10-15-22_"));
    }

    #[tokio::test]
    async fn test_create_inherits_title() {
        let history = service();
        let root = history.create(json!({"title": "Shop"})).await.unwrap();
        let child = history
            .create(json!({"parent_session_id": root.to_string()}))
            .await
            .unwrap();
        let own = history
            .create(json!({"parent_session_id": child.to_string(), "title": "Mine"}))
            .await
            .unwrap();

        let child_meta = history.read_metadata(&child).await.unwrap();
        assert_eq!(child_meta.title(), Some("Shop"));
        let own_meta = history.read_metadata(&own).await.unwrap();
        assert_eq!(own_meta.title(), Some("Mine"));
    }

    #[tokio::test]
    async fn test_update_title_and_delete() {
        let history = service();
        let reference = history.create(json!({"prompt": "x"})).await.unwrap();

        assert!(history.update_title(&reference, "Named").await.unwrap());
        assert_eq!(history.list_sessions().await.unwrap()[0].prompt, "Named");

        assert!(history.delete_session(&reference).await.unwrap());
        assert!(!history.delete_session(&reference).await.unwrap());
        assert!(!history.update_title(&reference, "Again").await.unwrap());
        assert!(history.get_session(&reference).await.unwrap().is_none());
        assert!(history.list_partitions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_options_from_config() {
        let config = StoreConfig {
            preview_chars: 4,
            ..StoreConfig::default()
        };
        let history =
            HistoryService::with_options(Arc::new(MemoryRecordStore::new()), (&config).into());
        history.create(json!({"prompt": "abcdefgh"})).await.unwrap();

        assert_eq!(history.list_sessions().await.unwrap()[0].prompt, "abcd...");
        assert_eq!(history.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_create_survives_failed_title_lookup() {
        let store = Arc::new(FlakyStore::new());
        let history = HistoryService::new(store.clone());
        let root = history.create(json!({"title": "Shop"})).await.unwrap();

        store.fail_listings(true);
        let child = history
            .create(json!({"prompt": "p", "parent_session_id": root.local_id()}))
            .await
            .unwrap();

        let metadata = history.read_metadata(&child).await.unwrap();
        assert_eq!(metadata.title(), None);
        assert_eq!(metadata.parent_session_id(), Some(root.local_id()));
    }

    #[tokio::test]
    async fn test_create_inherits_past_untitled_ancestor() {
        let history = service();
        let a = history.create(json!({})).await.unwrap();
        let b = history
            .create(json!({"parent_session_id": a.to_string()}))
            .await
            .unwrap();
        assert!(history.update_title(&a, "Shop").await.unwrap());

        let c = history
            .create(json!({"parent_session_id": b.to_string()}))
            .await
            .unwrap();

        assert_eq!(history.read_metadata(&b).await.unwrap().title(), None);
        assert_eq!(history.read_metadata(&c).await.unwrap().title(), Some("Shop"));
    }
}
