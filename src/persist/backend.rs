//! Durable key-value backends.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::trace;

use crate::error::SessionKeeperError;
use crate::Result;

/// Asynchronous byte-oriented key-value storage.
///
/// The store keeps its whole persisted snapshot under a single key.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`, or `None` if there is none.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Overwrite the value stored under `key`.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
}

/// In-process backend.
///
/// Sharing one instance between store instances simulates a restart over
/// the same device storage.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    available: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle availability. While unavailable every call fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SessionKeeperError::BackendUnavailable(
                "memory backend switched off".into(),
            ))
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check_available()?;
        let entries = self
            .entries
            .read()
            .map_err(|_| SessionKeeperError::BackendUnavailable("lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.check_available()?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| SessionKeeperError::BackendUnavailable("lock poisoned".into()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Backend keeping one JSON file per key under a root directory.
///
/// Writes go to a uniquely named temporary file that is synced to disk and
/// then renamed over the target, so a crash mid-write leaves the previous
/// value intact and concurrent writers never share a temporary file.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File that holds `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key_file_name(key))
    }

    fn tmp_path_for(&self, key: &str) -> PathBuf {
        static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!(
            ".{}.{}.{n}.tmp",
            key_file_name(key),
            std::process::id()
        ))
    }
}

async fn write_synced(path: &Path, value: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(value).await?;
    file.sync_all().await
}

/// Map a storage key to a file name that is safe on every platform.
pub fn key_file_name(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '-',
        })
        .collect();
    format!("{sanitized}.json")
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                trace!(path = %path.display(), len = bytes.len(), "read snapshot file");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionKeeperError::storage("reading", key, e)),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| SessionKeeperError::storage("creating directory for", key, e))?;

        let path = self.path_for(key);
        let tmp_path = self.tmp_path_for(key);

        if let Err(e) = write_synced(&tmp_path, &value).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(SessionKeeperError::storage("writing", key, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(SessionKeeperError::storage("committing", key, e));
        }

        trace!(path = %path.display(), len = value.len(), "wrote snapshot file");
        Ok(())
    }
}
