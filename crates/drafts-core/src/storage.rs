//! Keyed record store abstraction.
//!
//! Sessions are persisted through a narrow, hierarchical key/value interface so that the
//! session logic never touches paths directly. A key is a sequence of segments; every
//! proper prefix of a record key is a *namespace*.
//!
//! ```text
//! ["2026-01-28"]                                        namespace (partition)
//! ["2026-01-28", "15-03-04_512254cc"]                   namespace (session)
//! ["2026-01-28", "15-03-04_512254cc", "prompt.json"]    record
//! ```

use crate::error::{DraftsError, Result};
use async_trait::async_trait;
use std::fmt;

/// Validates a single key segment.
///
/// Segments map one-to-one onto file names in the directory backend, so anything that
/// could escape the store root or collide with temporary files is rejected.
pub fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(DraftsError::invalid_reference("empty key segment"));
    }
    if segment.starts_with('.') {
        return Err(DraftsError::invalid_reference(format!(
            "key segment '{}' must not start with '.'",
            segment
        )));
    }
    if segment.contains(['/', '\\', '\0']) {
        return Err(DraftsError::invalid_reference(format!(
            "key segment '{}' contains a path separator",
            segment
        )));
    }
    Ok(())
}

/// A validated, hierarchical key into a [`RecordStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    segments: Vec<String>,
}

impl RecordKey {
    /// The empty key, addressing the store root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a key from segments, validating each one.
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments = segments
            .into_iter()
            .map(Into::into)
            .collect::<Vec<String>>();
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self { segments })
    }

    /// Builds a key from segments that were validated on the way in.
    pub(crate) fn from_validated(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Returns a new key with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Result<Self> {
        let segment = segment.into();
        validate_segment(&segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment);
        Ok(Self { segments })
    }

    /// Returns the enclosing namespace, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Returns the last segment.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns true if `self` equals `other` or lies beneath it.
    pub fn starts_with(&self, other: &RecordKey) -> bool {
        self.segments.starts_with(&other.segments)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// A hierarchical keyed record store.
///
/// This trait decouples session persistence from the storage mechanism (a directory
/// tree, an embedded database, a remote object store).
///
/// # Implementation Notes
///
/// Implementations must guarantee:
/// - `put` is atomic: readers observe either the previous or the new value.
/// - `put` and `append` never create the enclosing namespace. Writing beneath a missing
///   namespace fails with [`DraftsError::NotFound`], so a deleted session is not revived
///   by a late writer.
/// - Operations on distinct keys do not interfere with each other.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Reads a record.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))`: Record found
    /// - `Ok(None)`: No record at this key
    /// - `Err(_)`: Storage failure
    async fn get(&self, key: &RecordKey) -> Result<Option<Vec<u8>>>;

    /// Atomically replaces a record.
    async fn put(&self, key: &RecordKey, value: &[u8]) -> Result<()>;

    /// Appends to a record, creating it if it does not exist yet.
    async fn append(&self, key: &RecordKey, value: &[u8]) -> Result<()>;

    /// Returns true if a record or namespace exists at `key`.
    async fn contains(&self, key: &RecordKey) -> Result<bool>;

    /// Creates a namespace and any missing ancestors.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: The namespace was created by this call
    /// - `Ok(false)`: The namespace already existed
    async fn create_namespace(&self, key: &RecordKey) -> Result<bool>;

    /// Lists the direct child namespaces of `key` in ascending order.
    ///
    /// A missing namespace yields an empty list. Records are not included.
    async fn list_namespaces(&self, key: &RecordKey) -> Result<Vec<String>>;

    /// Removes a namespace (or record) and everything beneath it.
    ///
    /// Returns `Ok(false)` if nothing existed at `key`.
    async fn remove(&self, key: &RecordKey) -> Result<bool>;

    /// Removes a namespace only if it is empty.
    ///
    /// Returns `Ok(true)` if the namespace was removed.
    async fn prune(&self, key: &RecordKey) -> Result<bool>;

    /// Short backend name used in logs.
    fn backend_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_traversal_segments() {
        assert!(RecordKey::new(["2026-01-28", ".."]).is_err());
        assert!(RecordKey::new(["a/b"]).is_err());
        assert!(RecordKey::new(["a\\b"]).is_err());
        assert!(RecordKey::new([".prompt.json.tmp"]).is_err());
        assert!(RecordKey::new([""]).is_err());
    }

    #[test]
    fn test_child_and_parent() {
        let session = RecordKey::new(["2026-01-28", "15-03-04_512254cc"]).unwrap();
        let record = session.child("prompt.json").unwrap();

        assert_eq!(record.to_string(), "2026-01-28/15-03-04_512254cc/prompt.json");
        assert_eq!(record.name(), Some("prompt.json"));
        assert_eq!(record.parent(), Some(session.clone()));
        assert!(record.starts_with(&session));
        assert!(!session.starts_with(&record));
        assert_eq!(RecordKey::root().parent(), None);
    }
}
