//! Session identity and namespace allocation.
//!
//! Every call mints its own reference from the clock plus randomness and reserves the
//! matching namespace. Reservation is the only point of contention, and it is scoped
//! to the new key, so creators never wait on each other.

use chrono::{Local, NaiveDateTime};
use drafts_core::error::{DraftsError, Result};
use drafts_core::session::SessionRef;
use drafts_core::storage::RecordStore;
use std::sync::Arc;

/// Source of the creation time used for partitions and local ids.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Re-mint attempts before allocation gives up.
const MAX_ALLOCATION_ATTEMPTS: usize = 16;

/// Returns a clock reading the local wall time.
pub fn system_clock() -> Clock {
    Arc::new(|| Local::now().naive_local())
}

/// Mints session references and owns the lifetime of their namespaces.
#[derive(Clone)]
pub struct SessionAllocator {
    store: Arc<dyn RecordStore>,
    clock: Clock,
}

impl SessionAllocator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Reserves a fresh, empty session namespace.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot create the namespace, or if every attempt collided
    /// with an existing session.
    pub async fn allocate(&self) -> Result<SessionRef> {
        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let reference = SessionRef::mint((self.clock)());
            if self.store.create_namespace(&reference.namespace()).await? {
                tracing::debug!("Allocated session namespace {}", reference);
                return Ok(reference);
            }
            tracing::debug!(
                "Session id {} already taken (attempt {}), re-minting",
                reference,
                attempt
            );
        }

        Err(DraftsError::internal(format!(
            "Could not allocate a unique session id after {} attempts",
            MAX_ALLOCATION_ATTEMPTS
        )))
    }

    /// Returns true if the session namespace exists.
    pub async fn exists(&self, reference: &SessionRef) -> Result<bool> {
        self.store.contains(&reference.namespace()).await
    }

    /// Removes a session namespace and reclaims its partition if it became empty.
    ///
    /// Returns `Ok(false)` if the session did not exist. Descendant sessions are left
    /// untouched.
    pub async fn release(&self, reference: &SessionRef) -> Result<bool> {
        if !self.store.remove(&reference.namespace()).await? {
            return Ok(false);
        }

        if self.store.prune(&reference.partition_key()).await? {
            tracing::debug!("Reclaimed empty partition {}", reference.partition());
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use drafts_infrastructure::MemoryRecordStore;

    fn fixed_clock() -> Clock {
        Arc::new(|| {
            NaiveDate::from_ymd_opt(2026, 1, 28)
                .unwrap()
                .and_hms_opt(10, 15, 22)
                .unwrap()
        })
    }

    #[tokio::test]
    async fn test_allocate_uses_clock_for_partition_and_prefix() {
        let store = Arc::new(MemoryRecordStore::new());
        let allocator = SessionAllocator::new(store.clone()).with_clock(fixed_clock());

        let reference = allocator.allocate().await.unwrap();

        assert_eq!(reference.partition(), "2026-01-28");
        assert!(reference.local_id().starts_with("10-15-22_"));
        assert!(allocator.exists(&reference).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_reclaims_only_empty_partition() {
        let store = Arc::new(MemoryRecordStore::new());
        let allocator = SessionAllocator::new(store.clone()).with_clock(fixed_clock());

        let first = allocator.allocate().await.unwrap();
        let second = allocator.allocate().await.unwrap();

        assert!(allocator.release(&first).await.unwrap());
        assert!(store.contains(&first.partition_key()).await.unwrap());
        assert!(!allocator.release(&first).await.unwrap());

        assert!(allocator.release(&second).await.unwrap());
        assert!(!store.contains(&second.partition_key()).await.unwrap());
    }
}
