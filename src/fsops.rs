//! Blocking filesystem helpers shared by the cache, orchestrator and source
//! management.

use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// File count, directory count and total bytes under a path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub files: u64,
    pub dirs: u64,
    pub bytes: u64,
}

/// Walk `path` (a file or a directory). The root directory itself is not counted.
pub fn tree_stats(path: &Path) -> io::Result<TreeStats> {
    let mut stats = TreeStats::default();
    for entry in WalkDir::new(path).min_depth(0) {
        let entry = entry.map_err(io::Error::from)?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            if entry.depth() > 0 {
                stats.dirs += 1;
            }
        } else if file_type.is_file() {
            stats.files += 1;
            stats.bytes += entry.metadata().map_err(io::Error::from)?.len();
        }
    }
    Ok(stats)
}

/// Total bytes of regular files under `path`.
pub fn tree_size(path: &Path) -> io::Result<u64> {
    tree_stats(path).map(|stats| stats.bytes)
}

/// Recursively copy directory `src` into `dst`, creating `dst`. Existing
/// files are overwritten. Returns the number of files copied.
pub fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<u64> {
    let mut copied = 0;
    fs::create_dir_all(dst)?;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Copy a file or directory to `dst`, creating parent directories.
pub fn copy_path(src: &Path, dst: &Path) -> io::Result<u64> {
    if src.is_dir() {
        return copy_dir_all(src, dst);
    }
    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::copy(src, dst)?;
    Ok(1)
}

/// `path` relative to `root` with `/` separators, or the full path when it
/// lies outside `root`.
pub fn relative_slash_path(root: &Path, path: &Path) -> String {
    let Ok(relative) = path.strip_prefix(root) else {
        return path.to_string_lossy().into_owned();
    };
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Remove a file or directory. A missing path is not an error.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
