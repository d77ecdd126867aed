//! In-memory record store.
//! Not persistent; used for tests and for embedding the history in short-lived processes.

use async_trait::async_trait;
use drafts_core::error::{DraftsError, Result};
use drafts_core::storage::{RecordKey, RecordStore};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
enum Node {
    Namespace,
    Record(Vec<u8>),
}

/// Record store backed by an ordered map.
///
/// Descendants of a key sort directly after it, so prefix scans are range scans.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    nodes: RwLock<BTreeMap<RecordKey, Node>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_namespace(nodes: &BTreeMap<RecordKey, Node>, key: &RecordKey) -> bool {
        key.is_root() || matches!(nodes.get(key), Some(Node::Namespace))
    }

    fn descendants<'a>(
        nodes: &'a BTreeMap<RecordKey, Node>,
        key: &'a RecordKey,
    ) -> impl Iterator<Item = (&'a RecordKey, &'a Node)> + 'a {
        nodes
            .range(key.clone()..)
            .take_while(move |(candidate, _)| candidate.starts_with(key))
            .filter(move |(candidate, _)| *candidate != key)
    }

    fn check_writable(nodes: &BTreeMap<RecordKey, Node>, key: &RecordKey) -> Result<()> {
        let parent = key
            .parent()
            .ok_or_else(|| DraftsError::invalid_reference("cannot write to the store root"))?;
        if !Self::is_namespace(nodes, &parent) {
            return Err(DraftsError::not_found("namespace", parent.to_string()));
        }
        if matches!(nodes.get(key), Some(Node::Namespace)) {
            return Err(DraftsError::io(format!("{} is a namespace", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<Vec<u8>>> {
        let nodes = self.nodes.read().await;
        match nodes.get(key) {
            Some(Node::Record(bytes)) => Ok(Some(bytes.clone())),
            _ => Ok(None),
        }
    }

    async fn put(&self, key: &RecordKey, value: &[u8]) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        Self::check_writable(&nodes, key)?;
        nodes.insert(key.clone(), Node::Record(value.to_vec()));
        Ok(())
    }

    async fn append(&self, key: &RecordKey, value: &[u8]) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        Self::check_writable(&nodes, key)?;
        match nodes
            .entry(key.clone())
            .or_insert_with(|| Node::Record(Vec::new()))
        {
            Node::Record(bytes) => bytes.extend_from_slice(value),
            Node::Namespace => return Err(DraftsError::io(format!("{} is a namespace", key))),
        }
        Ok(())
    }

    async fn contains(&self, key: &RecordKey) -> Result<bool> {
        let nodes = self.nodes.read().await;
        Ok(key.is_root() || nodes.contains_key(key))
    }

    async fn create_namespace(&self, key: &RecordKey) -> Result<bool> {
        if key.is_root() {
            return Ok(false);
        }
        let mut nodes = self.nodes.write().await;

        let mut current = RecordKey::root();
        let mut created = false;
        for segment in key.segments() {
            current = current.child(segment.as_str())?;
            match nodes.get(&current) {
                Some(Node::Namespace) => created = false,
                Some(Node::Record(_)) => {
                    return Err(DraftsError::io(format!("{} is a record", current)));
                }
                None => {
                    nodes.insert(current.clone(), Node::Namespace);
                    created = true;
                }
            }
        }
        Ok(created)
    }

    async fn list_namespaces(&self, key: &RecordKey) -> Result<Vec<String>> {
        let nodes = self.nodes.read().await;
        let depth = key.segments().len() + 1;
        Ok(Self::descendants(&nodes, key)
            .filter(|(candidate, node)| {
                candidate.segments().len() == depth && matches!(node, Node::Namespace)
            })
            .filter_map(|(candidate, _)| candidate.name().map(str::to_string))
            .collect())
    }

    async fn remove(&self, key: &RecordKey) -> Result<bool> {
        if key.is_root() {
            return Err(DraftsError::invalid_reference(
                "refusing to remove the store root",
            ));
        }
        let mut nodes = self.nodes.write().await;
        if nodes.remove(key).is_none() {
            return Ok(false);
        }
        let doomed: Vec<RecordKey> = Self::descendants(&nodes, key)
            .map(|(candidate, _)| candidate.clone())
            .collect();
        for candidate in doomed {
            nodes.remove(&candidate);
        }
        Ok(true)
    }

    async fn prune(&self, key: &RecordKey) -> Result<bool> {
        if key.is_root() {
            return Ok(false);
        }
        let mut nodes = self.nodes.write().await;
        if !matches!(nodes.get(key), Some(Node::Namespace)) {
            return Ok(false);
        }
        if Self::descendants(&nodes, key).next().is_some() {
            return Ok(false);
        }
        nodes.remove(key);
        Ok(true)
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(segments: &[&str]) -> RecordKey {
        RecordKey::new(segments.iter().copied()).unwrap()
    }

    #[tokio::test]
    async fn test_mirrors_directory_semantics() {
        let store = MemoryRecordStore::new();
        let session = key(&["2026-01-28", "s1"]);
        let record = session.child("prompt.json").unwrap();

        assert!(store.put(&record, b"{}").await.unwrap_err().is_not_found());
        assert!(store.create_namespace(&session).await.unwrap());
        assert!(!store.create_namespace(&session).await.unwrap());

        store.put(&record, b"{}").await.unwrap();
        store.append(&session.child("t.md").unwrap(), b"a").await.unwrap();
        store.append(&session.child("t.md").unwrap(), b"b").await.unwrap();
        assert_eq!(
            store.get(&session.child("t.md").unwrap()).await.unwrap(),
            Some(b"ab".to_vec())
        );
        assert_eq!(store.get(&session).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_only_direct_child_namespaces() {
        let store = MemoryRecordStore::new();
        store.create_namespace(&key(&["b", "s2"])).await.unwrap();
        store.create_namespace(&key(&["a", "s1"])).await.unwrap();
        store.create_namespace(&key(&["a0"])).await.unwrap();
        store
            .put(&key(&["a", "note.txt"]), b"x")
            .await
            .unwrap();

        assert_eq!(
            store.list_namespaces(&RecordKey::root()).await.unwrap(),
            vec!["a".to_string(), "a0".to_string(), "b".to_string()]
        );
        assert_eq!(
            store.list_namespaces(&key(&["a"])).await.unwrap(),
            vec!["s1".to_string()]
        );
        assert!(store.list_namespaces(&key(&["zz"])).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_recursive_and_prune_needs_empty() {
        let store = MemoryRecordStore::new();
        let partition = key(&["2026-01-28"]);
        let session = key(&["2026-01-28", "s1"]);
        store.create_namespace(&session).await.unwrap();
        store
            .put(&session.child("prompt.json").unwrap(), b"{}")
            .await
            .unwrap();

        assert!(!store.prune(&partition).await.unwrap());
        assert!(store.remove(&session).await.unwrap());
        assert!(
            !store
                .contains(&session.child("prompt.json").unwrap())
                .await
                .unwrap()
        );
        assert!(store.prune(&partition).await.unwrap());
        assert!(!store.contains(&partition).await.unwrap());
        assert!(!store.remove(&session).await.unwrap());
    }
}
