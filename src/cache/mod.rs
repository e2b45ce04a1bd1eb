//! Content cache of packages and assemblies.
//!
//! Single-file items carry a SHA-256 digest; directory items (`name@hash`
//! packages, `Name.X.Y.Z` assemblies) only carry their summed size.

pub mod item;
pub mod naming;
pub mod store;

pub use item::{CacheItem, CacheItemType};
pub use store::{compute_hash, resolve_cache_source, ContentCache, DEFAULT_CACHE_DIR};

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
