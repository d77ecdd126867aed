//! Directory-backed record store.
//!
//! Keys map directly onto paths below a root directory:
//!
//! ```text
//! root/
//! └── 2026-01-28/                   # ["2026-01-28"]
//!     └── 15-03-04_512254cc/        # ["2026-01-28", "15-03-04_512254cc"]
//!         ├── prompt.json           # records
//!         ├── variant_0_thought.md
//!         └── variant_0_code.html
//! ```

use super::atomic_file::AtomicFile;
use async_trait::async_trait;
use drafts_core::error::{DraftsError, Result};
use drafts_core::storage::{RecordKey, RecordStore, validate_segment};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Attempts made when a namespace's parent disappears while it is being created.
const CREATE_NAMESPACE_ATTEMPTS: usize = 3;

/// Record store persisting every key as a file or directory under `root`.
#[derive(Debug, Clone)]
pub struct FsRecordStore {
    root: PathBuf,
    durable: bool,
}

impl FsRecordStore {
    /// Creates a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        // Ensure base directory exists
        fs::create_dir_all(&root).await.map_err(|e| {
            DraftsError::io(format!(
                "Failed to create history directory {:?}: {}",
                root, e
            ))
        })?;

        Ok(Self {
            root,
            durable: true,
        })
    }

    /// Enables or disables fsync before records become visible.
    pub fn with_durability(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &RecordKey) -> PathBuf {
        key.segments()
            .iter()
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    async fn is_dir(path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    /// Fails with `NotFound` when the namespace enclosing `key` is missing.
    async fn require_parent(&self, key: &RecordKey) -> Result<()> {
        let parent = key
            .parent()
            .ok_or_else(|| DraftsError::invalid_reference("cannot write to the store root"))?;
        if Self::is_dir(&self.path_for(&parent)).await {
            Ok(())
        } else {
            Err(DraftsError::not_found("namespace", parent.to_string()))
        }
    }

    fn write_error(key: &RecordKey, err: io::Error) -> DraftsError {
        if err.kind() == io::ErrorKind::NotFound {
            let namespace = key.parent().unwrap_or_default();
            return DraftsError::not_found("namespace", namespace.to_string());
        }
        DraftsError::io(format!("Failed to write {}: {}", key, err))
    }
}

#[async_trait]
impl RecordStore for FsRecordStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        let err = match fs::read(&path).await {
            Ok(bytes) => return Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => e,
        };

        if Self::is_dir(&path).await {
            tracing::debug!("{} is a namespace, not a record: {}", key, err);
            return Ok(None);
        }
        Err(DraftsError::io(format!("Failed to read {}: {}", key, err)))
    }

    async fn put(&self, key: &RecordKey, value: &[u8]) -> Result<()> {
        self.require_parent(key).await?;

        AtomicFile::new(self.path_for(key))
            .write(value, self.durable)
            .await
            .map_err(|e| Self::write_error(key, e))
    }

    async fn append(&self, key: &RecordKey, value: &[u8]) -> Result<()> {
        self.require_parent(key).await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(key))
            .await
            .map_err(|e| Self::write_error(key, e))?;

        file.write_all(value)
            .await
            .map_err(|e| Self::write_error(key, e))?;
        file.flush().await.map_err(|e| Self::write_error(key, e))?;
        if self.durable {
            file.sync_data()
                .await
                .map_err(|e| Self::write_error(key, e))?;
        }
        Ok(())
    }

    async fn contains(&self, key: &RecordKey) -> Result<bool> {
        fs::try_exists(self.path_for(key))
            .await
            .map_err(|e| DraftsError::io(format!("Failed to stat {}: {}", key, e)))
    }

    async fn create_namespace(&self, key: &RecordKey) -> Result<bool> {
        if key.is_root() {
            return Ok(false);
        }
        let path = self.path_for(key);
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        let mut last_err = None;
        for _ in 0..CREATE_NAMESPACE_ATTEMPTS {
            fs::create_dir_all(&parent)
                .await
                .map_err(|e| DraftsError::io(format!("Failed to create {:?}: {}", parent, e)))?;

            match fs::create_dir(&path).await {
                Ok(()) => return Ok(true),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
                // The parent was pruned between the two calls; try again.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!("Parent of {} vanished during creation, retrying", key);
                    last_err = Some(e);
                }
                Err(e) => {
                    return Err(DraftsError::io(format!(
                        "Failed to create namespace {}: {}",
                        key, e
                    )));
                }
            }
        }

        Err(DraftsError::io(format!(
            "Failed to create namespace {} after {} attempts: {:?}",
            key, CREATE_NAMESPACE_ATTEMPTS, last_err
        )))
    }

    async fn list_namespaces(&self, key: &RecordKey) -> Result<Vec<String>> {
        let path = self.path_for(key);
        let mut entries = match fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) if e.kind() == io::ErrorKind::NotADirectory => return Ok(Vec::new()),
            Err(e) => {
                return Err(DraftsError::io(format!("Failed to list {}: {}", key, e)));
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DraftsError::io(format!("Failed to list {}: {}", key, e)))?
        {
            // file_type() does not follow symlinks, so links are never descended into.
            let is_dir = match entry.file_type().await {
                Ok(file_type) => file_type.is_dir(),
                Err(_) => false,
            };
            if !is_dir {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!("Skipping non UTF-8 entry in {}", key);
                continue;
            };
            if validate_segment(&name).is_ok() {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    async fn remove(&self, key: &RecordKey) -> Result<bool> {
        if key.is_root() {
            return Err(DraftsError::invalid_reference(
                "refusing to remove the store root",
            ));
        }
        let path = self.path_for(key);
        let meta = match fs::symlink_metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(DraftsError::io(format!("Failed to stat {}: {}", key, e))),
        };

        let result = if meta.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };

        match result {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DraftsError::io(format!("Failed to remove {}: {}", key, e))),
        }
    }

    async fn prune(&self, key: &RecordKey) -> Result<bool> {
        if key.is_root() {
            return Ok(false);
        }
        // remove_dir refuses non-empty directories, so a session created concurrently
        // in this namespace is never swept away.
        match fs::remove_dir(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::DirectoryNotEmpty
                ) =>
            {
                Ok(false)
            }
            Err(e) => Err(DraftsError::io(format!("Failed to prune {}: {}", key, e))),
        }
    }

    fn backend_name(&self) -> &str {
        "fs"
    }
}
