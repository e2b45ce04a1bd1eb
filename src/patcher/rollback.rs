use chrono::Utc;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use xxhash_rust::xxh3::xxh3_64;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Pre-images saved before a patch writes, keyed by rollback id.
///
/// An id is `<16 hex chars of the path hash>_<UTC timestamp>_<sequence>`;
/// the pre-image lives at `<dir>/<id>.rollback`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackStore {
    dir: PathBuf,
}

impl RollbackStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the system temp directory.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir().join("build-prep-rollback"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy the current bytes of `file` aside and return the rollback id.
    pub fn save(&self, file: &Path) -> io::Result<String> {
        fs::create_dir_all(&self.dir)?;

        let path_hash = xxh3_64(file.to_string_lossy().as_bytes());
        let id = format!(
            "{:016x}_{}_{}",
            path_hash,
            Utc::now().format("%Y%m%d%H%M%S%3f"),
            SEQUENCE.fetch_add(1, Ordering::Relaxed)
        );

        fs::copy(file, self.path_for(&id))?;
        tracing::debug!(id = %id, file = %file.display(), "saved rollback point");
        Ok(id)
    }

    /// Restore `file` from a saved pre-image. Returns false for an unknown id.
    pub fn restore(&self, file: &Path, id: &str) -> bool {
        if !is_valid_id(id) {
            return false;
        }
        let saved = self.path_for(id);
        if !saved.is_file() {
            tracing::warn!(id = %id, "rollback point not found");
            return false;
        }

        match fs::copy(&saved, file) {
            Ok(_) => {
                tracing::info!(file = %file.display(), "rolled back patch");
                true
            }
            Err(e) => {
                tracing::error!(file = %file.display(), error = %e, "rollback failed");
                false
            }
        }
    }

    /// Delete a saved pre-image. Unknown ids are ignored.
    pub fn cleanup(&self, id: &str) {
        if !is_valid_id(id) {
            return;
        }
        let saved = self.path_for(id);
        if saved.exists() {
            if let Err(e) = fs::remove_file(&saved) {
                tracing::warn!(id = %id, error = %e, "failed to remove rollback point");
            }
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.rollback"))
    }
}

/// Ids are generated by [`RollbackStore::save`]; reject anything that could
/// escape the store directory.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
