//! Last-observed payload per site.
//!
//! Each site's snapshot lives in its own `{site_id}_subscription.json` file,
//! so the id doubles as a file name and is checked at registration.

use crate::error::{MonitorError, Result};
use crate::sites::Payload;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Durable per-site snapshot storage.
pub trait SnapshotStore: Send + Sync {
    /// Last saved payload for `site_id`, or `None` if there is none yet.
    ///
    /// # Errors
    ///
    /// Returns an error if a snapshot exists but cannot be read or decoded.
    fn load(&self, site_id: &str) -> Result<Option<Payload>>;

    /// Replace the snapshot for `site_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    fn save(&self, site_id: &str, payload: &Payload) -> Result<()>;
}

/// Snapshots stored as pretty-printed JSON files in one directory.
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    dir: PathBuf,
}

impl FsSnapshotStore {
    /// Store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the snapshot for `site_id`.
    pub fn path_for(&self, site_id: &str) -> PathBuf {
        self.dir.join(format!("{site_id}_subscription.json"))
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn load(&self, site_id: &str) -> Result<Option<Payload>> {
        let path = self.path_for(site_id);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let payload = serde_json::from_slice(&bytes).map_err(|e| {
            MonitorError::Persistence(format!("snapshot {} is corrupt: {e}", path.display()))
        })?;
        Ok(Some(payload))
    }

    fn save(&self, site_id: &str, payload: &Payload) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(site_id);
        let body = serde_json::to_vec_pretty(payload)
            .map_err(|e| MonitorError::Persistence(format!("encoding snapshot: {e}")))?;

        // Write-then-rename so a crash never leaves a half-written snapshot.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Process-local snapshots for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<HashMap<String, Payload>>,
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, site_id: &str) -> Result<Option<Payload>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(site_id).cloned())
    }

    fn save(&self, site_id: &str, payload: &Payload) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(site_id.to_owned(), payload.clone());
        Ok(())
    }
}
