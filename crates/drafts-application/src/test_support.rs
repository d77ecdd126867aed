//! Store wrapper that injects storage failures.

use async_trait::async_trait;
use drafts_core::error::{DraftsError, Result};
use drafts_core::storage::{RecordKey, RecordStore};
use drafts_infrastructure::MemoryRecordStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryRecordStore,
    failing_gets: AtomicUsize,
    failing_listings: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` reads fail with an I/O error.
    pub fn fail_next_gets(&self, count: usize) {
        self.failing_gets.store(count, Ordering::SeqCst);
    }

    pub fn fail_listings(&self, fail: bool) {
        self.failing_listings.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<Vec<u8>>> {
        let failing = self
            .failing_gets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DraftsError::io(format!("EIO reading {}", key)));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &RecordKey, value: &[u8]) -> Result<()> {
        self.inner.put(key, value).await
    }

    async fn append(&self, key: &RecordKey, value: &[u8]) -> Result<()> {
        self.inner.append(key, value).await
    }

    async fn contains(&self, key: &RecordKey) -> Result<bool> {
        self.inner.contains(key).await
    }

    async fn create_namespace(&self, key: &RecordKey) -> Result<bool> {
        self.inner.create_namespace(key).await
    }

    async fn list_namespaces(&self, key: &RecordKey) -> Result<Vec<String>> {
        if self.failing_listings.load(Ordering::SeqCst) {
            return Err(DraftsError::io(format!("EIO listing {}", key)));
        }
        self.inner.list_namespaces(key).await
    }

    async fn remove(&self, key: &RecordKey) -> Result<bool> {
        self.inner.remove(key).await
    }

    async fn prune(&self, key: &RecordKey) -> Result<bool> {
        self.inner.prune(key).await
    }

    fn backend_name(&self) -> &str {
        "flaky"
    }
}
