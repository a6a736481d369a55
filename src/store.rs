use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::warn;

use crate::encoding;

/// Errors produced while writing a snapshot after a mutation.
///
/// The in-memory mutation has already been applied when one of these is
/// returned; the caller decides whether to log it or escalate.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write snapshot to '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// In-memory key-value store mirrored to a snapshot file.
///
/// Every mutation rewrites the entire mapping to the backing file while the
/// exclusive lock is still held, so the disk write is on the critical path
/// of each Put/Delete and blocks concurrent readers for its duration. This
/// full-snapshot-per-mutation behavior is the store's durability contract,
/// not an implementation accident; the write cost is O(total store size).
pub struct Store {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    backing_path: PathBuf,
}

impl Store {
    /// Open the store, loading the snapshot at `path` if one exists.
    ///
    /// A missing file yields an empty store. A file that exists but cannot
    /// be read or decoded also yields an empty store; that case is logged,
    /// since continuing will discard the unreadable data on the next
    /// mutation. Neither case is an error to the caller.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let backing_path = path.into();
        let entries = Self::load(&backing_path).await;
        Self {
            entries: RwLock::new(entries),
            backing_path,
        }
    }

    async fn load(path: &Path) -> HashMap<String, Vec<u8>> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                warn!("could not read snapshot '{}': {e}", path.display());
                return HashMap::new();
            }
        };
        match encoding::decode(&bytes) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "snapshot '{}' is unreadable, starting empty: {e}",
                    path.display()
                );
                HashMap::new()
            }
        }
    }

    /// Path of the backing snapshot file.
    pub fn backing_path(&self) -> &Path {
        &self.backing_path
    }

    /// Get the value for a key, or `None` if absent.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().await;
        entries.get(key).cloned()
    }

    /// Insert or overwrite a key, then snapshot the whole mapping.
    ///
    /// The in-memory insert always succeeds; an `Err` means only that the
    /// snapshot write failed and the on-disk copy is now stale.
    pub async fn put(&self, key: String, value: Vec<u8>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(key, value);
        self.save(&entries).await
    }

    /// Remove a key if present (a no-op otherwise), then snapshot.
    ///
    /// Same failure contract as [`Store::put`].
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        self.save(&entries).await
    }

    /// Serialize the entire mapping and overwrite the backing file.
    ///
    /// Called with the write guard held so no mutation can interleave
    /// between the in-memory update and the disk write.
    async fn save(&self, entries: &HashMap<String, Vec<u8>>) -> Result<(), StoreError> {
        let bytes = encoding::encode(entries)?;
        fs::write(&self.backing_path, bytes)
            .await
            .map_err(|source| StoreError::Write {
                path: self.backing_path.clone(),
                source,
            })
    }
}
