//! Durable local snapshot blobs.

use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// One JSON blob per collection name under a configured directory.
///
/// Persisted blobs give the next session an instant first paint: they are
/// restored verbatim into the mirrors at startup and superseded by the
/// first live snapshot. Persisted data is never treated as authoritative.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Create a snapshot store rooted at `dir`.
    ///
    /// The directory is created lazily on the first `save`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Load the persisted records for `name`.
    ///
    /// Returns `None` when no blob exists. An unreadable blob is discarded
    /// with a warning; the next live snapshot rebuilds it.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Option<Vec<T>> {
        let path = self.blob_path(name);
        let raw = fs::read(&path).ok()?;
        match serde_json::from_slice(&raw) {
            Ok(records) => Some(records),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "Discarding unreadable snapshot blob"
                );
                None
            }
        }
    }

    /// Persist `records` as the blob for `name`.
    ///
    /// Writes to a temporary file and renames it into place.
    pub fn save<T: Serialize>(&self, name: &str, records: &[T]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!("{name}.json.tmp"));
        fs::write(&tmp, serde_json::to_vec(records)?)?;
        fs::rename(&tmp, self.blob_path(name))?;
        Ok(())
    }
}
