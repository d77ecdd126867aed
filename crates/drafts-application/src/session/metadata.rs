//! Metadata persistence.
//!
//! Each session owns one JSON record. Reads are forgiving: a missing, half-written or
//! hand-edited record reads as absent and never fails the surrounding operation.

use drafts_core::error::{DraftsError, Result};
use drafts_core::session::{SessionMetadata, SessionRef};
use drafts_core::storage::RecordStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Name of the metadata record inside a session namespace.
pub const METADATA_RECORD: &str = "prompt.json";

/// Per-session async locks serializing read-modify-write cycles.
///
/// Each session gets its own mutex so different sessions don't block each other.
#[derive(Default)]
struct SessionLocks {
    locks: Mutex<HashMap<SessionRef, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    fn get(&self, reference: &SessionRef) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Drop locks nobody holds anymore.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(reference.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Reads and writes session metadata records.
#[derive(Clone)]
pub struct MetadataStore {
    store: Arc<dyn RecordStore>,
    locks: Arc<SessionLocks>,
}

impl MetadataStore {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            locks: Arc::new(SessionLocks::default()),
        }
    }

    /// Loads the metadata of a session.
    ///
    /// Returns `None` when the record is missing or cannot be decoded; the latter is
    /// logged as a warning.
    pub async fn read(&self, reference: &SessionRef) -> Option<SessionMetadata> {
        match self.try_read(reference).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Ignoring metadata of {}: {}", reference, e);
                None
            }
        }
    }

    async fn try_read(&self, reference: &SessionRef) -> Result<Option<SessionMetadata>> {
        let Some(bytes) = self.store.get(&reference.record(METADATA_RECORD)?).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| DraftsError::MetadataCorrupt {
                session: reference.to_string(),
                message: e.to_string(),
            })
    }

    /// Atomically replaces the metadata record of an existing session.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session namespace does not exist
    /// - `Io` if the record could not be written; the previous record stays intact
    pub async fn write(&self, reference: &SessionRef, metadata: &SessionMetadata) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(metadata)?;
        self.store
            .put(&reference.record(METADATA_RECORD)?, &bytes)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    DraftsError::session_not_found(reference.to_string())
                } else {
                    e
                }
            })
    }

    /// Sets the title of a session.
    ///
    /// Returns `Ok(false)` if the session does not exist. A session whose record is
    /// missing or cannot be decoded gets a fresh record holding only the title; a record
    /// that cannot be read at all is left untouched and the error is returned.
    pub async fn update_title(&self, reference: &SessionRef, title: &str) -> Result<bool> {
        let lock = self.locks.get(reference);
        let _guard = lock.lock().await;

        if !self.store.contains(&reference.namespace()).await? {
            return Ok(false);
        }

        let mut metadata = match self.try_read(reference).await {
            Ok(metadata) => metadata.unwrap_or_default(),
            Err(e @ DraftsError::MetadataCorrupt { .. }) => {
                tracing::warn!("Replacing unreadable metadata of {}: {}", reference, e);
                SessionMetadata::new()
            }
            Err(e) => return Err(e),
        };
        metadata.set_title(title);

        match self.write(reference, &metadata).await {
            Ok(()) => Ok(true),
            // Deleted between the existence check and the write.
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
