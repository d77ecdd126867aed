//! Atomic file replacement.
//!
//! Provides a thin layer for replacing a file so that concurrent readers never see a
//! partially written record.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// A handle to a file that is only ever replaced as a whole.
///
/// Provides:
/// - **Atomicity**: Updates are all-or-nothing via tmp file + atomic rename
/// - **Isolation**: Every writer uses its own temporary sibling
/// - **Durability**: Optional fsync before rename
pub struct AtomicFile {
    path: PathBuf,
}

impl AtomicFile {
    /// Creates a new atomic file handle.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `data` to the file atomically.
    ///
    /// The parent directory must already exist. On failure the temporary file is removed
    /// and the target keeps its previous content.
    pub async fn write(&self, data: &[u8], durable: bool) -> io::Result<()> {
        let tmp_path = self.temp_path()?;

        if let Err(e) = Self::write_tmp(&tmp_path, data, durable).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e);
        }

        Ok(())
    }

    async fn write_tmp(tmp_path: &Path, data: &[u8], durable: bool) -> io::Result<()> {
        let mut tmp_file = File::create(tmp_path).await?;
        tmp_file.write_all(data).await?;
        tmp_file.flush().await?;

        // Ensure data is written to disk
        if durable {
            tmp_file.sync_all().await?;
        }
        Ok(())
    }

    /// Gets a unique temporary sibling path, e.g. `.prompt.json.1f2e3d4c.tmp`.
    fn temp_path(&self) -> io::Result<PathBuf> {
        let parent = self.path.parent().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "Path has no parent directory")
        })?;

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no file name"))?;

        let nonce = Uuid::new_v4().simple().to_string();
        let tmp_name = format!(".{}.{}.tmp", file_name.to_string_lossy(), &nonce[..8]);
        Ok(parent.join(tmp_name))
    }
}
