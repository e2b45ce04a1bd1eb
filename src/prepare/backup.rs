//! Zip snapshots of project paths taken before a run mutates them.

use crate::fsops;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Project-relative default location of backup archives.
pub const DEFAULT_BACKUP_DIR: &str = "build/preparation/backups";

/// File looked up when a restore is pointed at a directory.
pub const BACKUP_FILE_NAME: &str = "backup.zip";

const BACKUP_PREFIX: &str = "backup_";

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("No backup found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Cannot back up {}: path is outside the project root", .0.display())]
    OutsideProject(PathBuf),

    #[error("Backup archive entry '{0}' escapes the project root")]
    UnsafeEntry(String),

    #[error("Backup I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid backup archive {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl BackupError {
    fn io(path: &Path, source: io::Error) -> Self {
        BackupError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn zip(path: &Path, source: zip::result::ZipError) -> Self {
        BackupError::Zip {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A written backup archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub path: PathBuf,
    /// Archived paths, project-relative
    pub paths: Vec<String>,
    /// Number of file entries written
    pub files: usize,
}

/// Archive every existing path in `paths` (files, or directories
/// recursively) into a new timestamped zip under `backup_dir`.
pub fn create(
    project_root: &Path,
    backup_dir: &Path,
    paths: &[PathBuf],
) -> Result<Backup, BackupError> {
    fs::create_dir_all(backup_dir).map_err(|e| BackupError::io(backup_dir, e))?;
    let archive_path = backup_dir.join(archive_name());
    let file = File::create(&archive_path).map_err(|e| BackupError::io(&archive_path, e))?;

    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut backup = Backup {
        path: archive_path.clone(),
        paths: Vec::new(),
        files: 0,
    };

    for path in paths.iter().filter(|p| p.exists()) {
        if !path.starts_with(project_root) {
            return Err(BackupError::OutsideProject(path.clone()));
        }
        for entry in WalkDir::new(path) {
            let entry = entry.map_err(|e| BackupError::io(path, e.into()))?;
            let name = fsops::relative_slash_path(project_root, entry.path());
            if entry.file_type().is_dir() {
                zip.add_directory(name, options)
                    .map_err(|e| BackupError::zip(&archive_path, e))?;
            } else if entry.file_type().is_file() {
                zip.start_file(name, options)
                    .map_err(|e| BackupError::zip(&archive_path, e))?;
                let mut f = File::open(entry.path()).map_err(|e| BackupError::io(entry.path(), e))?;
                io::copy(&mut f, &mut zip).map_err(|e| BackupError::io(&archive_path, e))?;
                backup.files += 1;
            }
        }
        backup.paths.push(fsops::relative_slash_path(project_root, path));
    }

    zip.finish().map_err(|e| BackupError::zip(&archive_path, e))?;
    tracing::debug!(
        path = %archive_path.display(),
        files = backup.files,
        "backup archive written"
    );
    Ok(backup)
}

/// Extract every entry of `archive` under `project_root`, overwriting what
/// is there. Returns the number of files written.
pub fn restore_archive(archive: &Path, project_root: &Path) -> Result<usize, BackupError> {
    let file = File::open(archive).map_err(|e| BackupError::io(archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| BackupError::zip(archive, e))?;

    let mut restored = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| BackupError::zip(archive, e))?;
        let relative = entry
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| BackupError::UnsafeEntry(entry.name().to_string()))?;
        let out_path = project_root.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| BackupError::io(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| BackupError::io(parent, e))?;
        }
        let mut out = File::create(&out_path).map_err(|e| BackupError::io(&out_path, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| BackupError::io(&out_path, e))?;
        restored += 1;
    }
    Ok(restored)
}

/// Newest `backup_*.zip` in `backup_dir`. Names embed the creation time, so
/// lexical order is chronological.
pub fn latest(backup_dir: &Path) -> Option<PathBuf> {
    fs::read_dir(backup_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path.file_name().and_then(|n| n.to_str()).is_some_and(|name| {
                    name.starts_with(BACKUP_PREFIX) && name.ends_with(".zip")
                })
        })
        .max()
}

/// Archive to restore from: `requested` (a zip, or a directory holding
/// [`BACKUP_FILE_NAME`]) or the newest backup in `backup_dir`.
pub fn locate(requested: Option<&Path>, backup_dir: &Path) -> Result<PathBuf, BackupError> {
    match requested {
        Some(path) if path.is_dir() => {
            let archive = path.join(BACKUP_FILE_NAME);
            if archive.is_file() {
                Ok(archive)
            } else {
                Err(BackupError::NotFound(archive))
            }
        }
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(BackupError::NotFound(path.to_path_buf())),
        None => latest(backup_dir).ok_or_else(|| BackupError::NotFound(backup_dir.to_path_buf())),
    }
}

fn archive_name() -> String {
    format!(
        "{}{}.zip",
        BACKUP_PREFIX,
        chrono::Local::now().format("%Y%m%d_%H%M%S_%3f")
    )
}
