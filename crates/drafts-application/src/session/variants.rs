//! Variant artifacts.
//!
//! A variant is addressed by its index inside the session and owns two records: an
//! append-only reasoning trace and the generated code, which is replaced as a whole.
//! Indices form a contiguous run starting at zero; readers stop at the first hole.

use drafts_core::error::{DraftsError, Result};
use drafts_core::session::{SessionRef, Variant};
use drafts_core::storage::{RecordKey, RecordStore};
use std::sync::Arc;

fn thought_record(index: usize) -> String {
    format!("variant_{}_thought.md", index)
}

fn code_record(index: usize) -> String {
    format!("variant_{}_code.html", index)
}

/// Reads and writes the variant artifacts of sessions.
#[derive(Clone)]
pub struct VariantStore {
    store: Arc<dyn RecordStore>,
}

impl VariantStore {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Reserves the traces of variants `0..count` in index order.
    ///
    /// Producers streaming several variants in parallel call this first so that a
    /// fast producer for a high index never writes past a missing predecessor.
    /// Existing traces are kept as they are.
    pub async fn begin(&self, reference: &SessionRef, count: usize) -> Result<()> {
        self.ensure_session(reference).await?;
        for index in 0..count {
            let key = reference.record(&thought_record(index))?;
            self.store
                .append(&key, &[])
                .await
                .map_err(|e| Self::session_error(reference, e))?;
        }
        tracing::debug!("Reserved {} variant(s) for {}", count, reference);
        Ok(())
    }

    /// Appends a chunk to the reasoning trace of a variant.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session does not exist
    /// - `VariantGap` if `index > 0` and variant `index - 1` has no artifact yet
    pub async fn append_thought(
        &self,
        reference: &SessionRef,
        index: usize,
        chunk: &str,
    ) -> Result<()> {
        self.ensure_writable(reference, index).await?;
        let key = reference.record(&thought_record(index))?;
        self.store
            .append(&key, chunk.as_bytes())
            .await
            .map_err(|e| Self::session_error(reference, e))
    }

    /// Replaces the generated code of a variant.
    ///
    /// Same error cases as [`VariantStore::append_thought`].
    pub async fn save_code(&self, reference: &SessionRef, index: usize, code: &str) -> Result<()> {
        self.ensure_writable(reference, index).await?;
        let key = reference.record(&code_record(index))?;
        self.store
            .put(&key, code.as_bytes())
            .await
            .map_err(|e| Self::session_error(reference, e))?;
        tracing::debug!("Saved code of variant {} for {}", index, reference);
        Ok(())
    }

    /// Reads variants from index 0 up to the first index with neither artifact.
    ///
    /// A trace still being streamed reads as whatever prefix has been flushed.
    pub async fn read(&self, reference: &SessionRef) -> Result<Vec<Variant>> {
        let mut variants = Vec::new();
        loop {
            let index = variants.len();
            let thought = self.read_text(&reference.record(&thought_record(index))?).await?;
            let code = self.read_text(&reference.record(&code_record(index))?).await?;
            if thought.is_none() && code.is_none() {
                break;
            }
            variants.push(Variant {
                index,
                thought,
                code,
            });
        }
        Ok(variants)
    }

    /// Reads the reasoning trace of a single variant.
    pub async fn read_thought(
        &self,
        reference: &SessionRef,
        index: usize,
    ) -> Result<Option<String>> {
        self.read_text(&reference.record(&thought_record(index))?).await
    }

    async fn exists(&self, reference: &SessionRef, index: usize) -> Result<bool> {
        Ok(self.store.contains(&reference.record(&thought_record(index))?).await?
            || self.store.contains(&reference.record(&code_record(index))?).await?)
    }

    async fn read_text(&self, key: &RecordKey) -> Result<Option<String>> {
        Ok(self
            .store
            .get(key)
            .await?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    async fn ensure_session(&self, reference: &SessionRef) -> Result<()> {
        if self.store.contains(&reference.namespace()).await? {
            Ok(())
        } else {
            Err(DraftsError::session_not_found(reference.to_string()))
        }
    }

    async fn ensure_writable(&self, reference: &SessionRef, index: usize) -> Result<()> {
        self.ensure_session(reference).await?;
        if index > 0 && !self.exists(reference, index - 1).await? {
            return Err(DraftsError::VariantGap {
                session: reference.to_string(),
                index,
            });
        }
        Ok(())
    }

    // The namespace can vanish between the checks and the write.
    fn session_error(reference: &SessionRef, err: DraftsError) -> DraftsError {
        if err.is_not_found() {
            DraftsError::session_not_found(reference.to_string())
        } else {
            err
        }
    }
}
