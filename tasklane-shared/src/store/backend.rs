/// Durable snapshot backends
///
/// The store keeps all state in memory and hands the whole snapshot to a
/// [`SnapshotBackend`] after every mutation. Two backends ship with the
/// crate:
///
/// - [`FileBackend`]: pretty-printed JSON on disk, replaced atomically via a
///   temporary file and rename
/// - [`MemoryBackend`]: keeps the last snapshot in memory, for tests
///
/// # Example
///
/// ```no_run
/// use tasklane_shared::store::backend::{FileBackend, SnapshotBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = FileBackend::new("data.json");
/// let snapshot = backend.load().await?;
/// println!("found existing snapshot: {}", snapshot.is_some());
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use super::StoreError;
use crate::models::{task::Task, user::User};

/// Complete persisted state: one document, two collections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,

    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Where the snapshot lives between process runs
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// Reads the last saved snapshot
    ///
    /// Returns `Ok(None)` when nothing has been saved yet and
    /// `Err(StoreError::Storage)` when something exists but cannot be read.
    async fn load(&self) -> Result<Option<Snapshot>, StoreError>;

    /// Replaces the saved snapshot with `snapshot`
    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// Short description for log lines
    fn describe(&self) -> String;
}

/// JSON file backend
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotBackend for FileBackend {
    async fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StoreError::Storage(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    err
                )))
            }
        };

        serde_json::from_slice(&raw).map(Some).map_err(|err| {
            StoreError::Storage(format!(
                "failed to parse {}: {}",
                self.path.display(),
                err
            ))
        })
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                StoreError::Storage(format!("failed to create {}: {}", parent.display(), err))
            })?;
        }

        let payload = serde_json::to_vec_pretty(snapshot)
            .map_err(|err| StoreError::Storage(format!("failed to encode snapshot: {}", err)))?;

        // Write beside the target so the rename stays on one filesystem
        let temp_path = self
            .path
            .with_extension(format!("{}.tmp", Uuid::new_v4().simple()));

        tokio::fs::write(&temp_path, payload).await.map_err(|err| {
            StoreError::Storage(format!("failed to write {}: {}", temp_path.display(), err))
        })?;

        if let Err(err) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StoreError::Storage(format!(
                "failed to replace {}: {}",
                self.path.display(),
                err
            )));
        }

        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// In-memory backend for tests
///
/// Keeps the most recently saved snapshot and counts saves. Writes can be
/// switched to fail to exercise the store's degraded-persistence path.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    saved: Mutex<Option<Snapshot>>,
    saves: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that already holds `snapshot`, as if a previous run saved it
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            saved: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    /// Last successfully saved snapshot
    pub fn saved(&self) -> Option<Snapshot> {
        self.saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotBackend for MemoryBackend {
    async fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.saved())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("memory backend write disabled".to_string()));
        }

        *self
            .saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
