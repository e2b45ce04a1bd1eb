use crate::cache::item::{CacheItem, CacheItemType};
use crate::cache::naming::{
    extension_of, file_stem, package_file_name, parse_hashed_dir, parse_package_file_name,
    parse_versioned_dir, ASSEMBLY_EXTENSION, PACKAGE_EXTENSION,
};
use crate::cache::CacheError;
use crate::config::{AssemblyReference, PackageReference, PreparationConfig};
use crate::fsops;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Project-relative default location of the cache.
pub const DEFAULT_CACHE_DIR: &str = "build/preparation/cache";

const PACKAGES_TARGET: &str = "projects/client/Packages";
const PLUGINS_TARGET: &str = "projects/client/Assets/Plugins";

/// Flat content cache of packages and assemblies.
///
/// Item paths are recorded relative to the project root so configs stay
/// portable between checkouts.
#[derive(Debug, Clone)]
pub struct ContentCache {
    project_root: PathBuf,
    dir: PathBuf,
}

impl ContentCache {
    /// `dir` is resolved against `project_root` when relative.
    pub fn new(project_root: impl Into<PathBuf>, dir: impl AsRef<Path>) -> Self {
        let project_root = project_root.into();
        let dir = project_root.join(dir.as_ref());
        Self { project_root, dir }
    }

    pub fn with_default_dir(project_root: impl Into<PathBuf>) -> Self {
        Self::new(project_root, DEFAULT_CACHE_DIR)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy a package file in as `<name>-<version>.tgz`, replacing any
    /// previous bytes for the same name and version.
    pub fn add_item(
        &self,
        name: &str,
        version: &str,
        source_file: &Path,
    ) -> Result<CacheItem, CacheError> {
        let target = self.dir.join(package_file_name(name, version));
        self.copy_file_in(source_file, &target)?;
        let item = self.file_item(&target, CacheItemType::Package, name, Some(version), None)?;
        tracing::info!(name, version, path = %item.path, "cached package");
        Ok(item)
    }

    /// Copy an assembly in under its own file name.
    pub fn add_assembly(
        &self,
        name: &str,
        version: Option<&str>,
        source_file: &Path,
    ) -> Result<CacheItem, CacheError> {
        let file_name = source_file
            .file_name()
            .ok_or_else(|| CacheError::SourceNotFound(source_file.to_path_buf()))?;
        let target = self.dir.join(file_name);
        self.copy_file_in(source_file, &target)?;
        let item = self.file_item(&target, CacheItemType::Assembly, name, version, None)?;
        tracing::info!(name, path = %item.path, "cached assembly");
        Ok(item)
    }

    /// Copy every recognised artifact found anywhere under `source_dir` into
    /// the flat cache. `name@hash` and `Name.X.Y.Z` directories are taken as
    /// whole items and not descended into. With a config, each item is also
    /// registered as a package or assembly reference.
    pub fn populate_from_directory(
        &self,
        source_dir: &Path,
        mut config: Option<&mut PreparationConfig>,
    ) -> Result<Vec<CacheItem>, CacheError> {
        if !source_dir.is_dir() {
            return Err(CacheError::SourceNotFound(source_dir.to_path_buf()));
        }
        fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;
        tracing::info!(
            source = %source_dir.display(),
            cache = %self.dir.display(),
            "populating cache"
        );

        let origin = fsops::relative_slash_path(&self.project_root, source_dir);
        let mut items = Vec::new();
        let mut walker = WalkDir::new(source_dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();
        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(source_dir).to_path_buf();
                CacheError::io(&path, io::Error::from(e))
            })?;
            let entry = entry.into_path();
            if entry == self.dir {
                walker.skip_current_dir();
                continue;
            }
            let Some(file_name) = entry.file_name().and_then(|n| n.to_str()).map(String::from)
            else {
                continue;
            };

            let Some(found) = classify(&entry, &file_name) else {
                if entry.is_file() {
                    tracing::debug!(path = %entry.display(), "skipping unrecognised file");
                }
                continue;
            };
            if found.shape == Shape::Directory {
                walker.skip_current_dir();
            }

            let cached = self.dir.join(&file_name);
            let mut item = match found.shape {
                Shape::File => {
                    self.copy_file_in(&entry, &cached)?;
                    self.file_item(
                        &cached,
                        found.item_type,
                        &found.name,
                        found.version.as_deref(),
                        None,
                    )?
                }
                Shape::Directory => {
                    fsops::copy_dir_all(&entry, &cached).map_err(|e| CacheError::io(&entry, e))?;
                    self.dir_item(&cached, found.item_type, &found.name, found.version.as_deref())?
                }
            };
            item.source = Some(origin.clone());

            if let Some(config) = config.as_deref_mut() {
                register(config, &item, &found, &file_name, &self.dir, &self.project_root);
            }

            tracing::debug!(name = %item.name, item_type = %item.item_type, "cached item");
            items.push(item);
        }

        tracing::info!(count = items.len(), "cache populated");
        Ok(items)
    }

    /// Everything at the top level of the cache.
    pub fn list(&self) -> Result<Vec<CacheItem>, CacheError> {
        if !self.dir.is_dir() {
            tracing::warn!(path = %self.dir.display(), "cache directory does not exist");
            return Ok(Vec::new());
        }

        let mut items = Vec::new();
        for entry in sorted_entries(&self.dir)? {
            let Some(file_name) = entry.file_name().and_then(|n| n.to_str()).map(String::from)
            else {
                continue;
            };

            let item = match classify(&entry, &file_name) {
                Some(found) if found.shape == Shape::Directory => {
                    self.dir_item(&entry, found.item_type, &found.name, found.version.as_deref())?
                }
                Some(found) => self.file_item(
                    &entry,
                    found.item_type,
                    &found.name,
                    found.version.as_deref(),
                    None,
                )?,
                None if entry.is_dir() => {
                    self.dir_item(&entry, CacheItemType::Package, &file_name, None)?
                }
                None => {
                    let stem = file_stem(&file_name);
                    self.file_item(&entry, CacheItemType::Other, stem, None, None)?
                }
            };
            items.push(item);
        }

        tracing::debug!(count = items.len(), "listed cache");
        Ok(items)
    }

    /// Delete the top-level files of the cache. Directories are left alone.
    pub fn clean(&self) -> Result<usize, CacheError> {
        if !self.dir.is_dir() {
            tracing::warn!(path = %self.dir.display(), "cache directory does not exist");
            return Ok(0);
        }

        let mut removed = 0;
        for entry in sorted_entries(&self.dir)? {
            if entry.is_file() {
                fs::remove_file(&entry).map_err(|e| CacheError::io(&entry, e))?;
                tracing::debug!(path = %entry.display(), "deleted cache file");
                removed += 1;
            }
        }

        tracing::info!(removed, "cache cleaned");
        Ok(removed)
    }

    fn copy_file_in(&self, source: &Path, target: &Path) -> Result<(), CacheError> {
        if !source.is_file() {
            return Err(CacheError::SourceNotFound(source.to_path_buf()));
        }
        fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;
        fs::copy(source, target).map_err(|e| CacheError::io(source, e))?;
        Ok(())
    }

    fn file_item(
        &self,
        path: &Path,
        item_type: CacheItemType,
        name: &str,
        version: Option<&str>,
        source: Option<String>,
    ) -> Result<CacheItem, CacheError> {
        let size = fs::metadata(path).map_err(|e| CacheError::io(path, e))?.len();
        let hash = compute_hash(path).map_err(|e| CacheError::io(path, e))?;
        Ok(CacheItem {
            item_type,
            name: name.to_string(),
            version: version.map(String::from),
            path: fsops::relative_slash_path(&self.project_root, path),
            size,
            hash: Some(hash),
            added_date: Utc::now(),
            source,
        })
    }

    fn dir_item(
        &self,
        path: &Path,
        item_type: CacheItemType,
        name: &str,
        version: Option<&str>,
    ) -> Result<CacheItem, CacheError> {
        let size = fsops::tree_size(path).map_err(|e| CacheError::io(path, e))?;
        Ok(CacheItem {
            item_type,
            name: name.to_string(),
            version: version.map(String::from),
            path: fsops::relative_slash_path(&self.project_root, path),
            size,
            hash: None,
            added_date: Utc::now(),
            source: None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    File,
    Directory,
}

#[derive(Debug)]
struct Recognised {
    shape: Shape,
    item_type: CacheItemType,
    name: String,
    version: Option<String>,
}

fn classify(path: &Path, file_name: &str) -> Option<Recognised> {
    if path.is_dir() {
        if let Some((name, hash)) = parse_hashed_dir(file_name) {
            return Some(Recognised {
                shape: Shape::Directory,
                item_type: CacheItemType::Package,
                name,
                version: Some(hash),
            });
        }
        return parse_versioned_dir(file_name).map(|(name, version)| Recognised {
            shape: Shape::Directory,
            item_type: CacheItemType::Assembly,
            name,
            version: Some(version),
        });
    }

    match extension_of(file_name).as_deref() {
        Some(PACKAGE_EXTENSION) => {
            let (name, version) = parse_package_file_name(file_name);
            Some(Recognised {
                shape: Shape::File,
                item_type: CacheItemType::Package,
                name,
                version: Some(version),
            })
        }
        Some(ASSEMBLY_EXTENSION) => Some(Recognised {
            shape: Shape::File,
            item_type: CacheItemType::Assembly,
            name: file_stem(file_name).to_string(),
            version: None,
        }),
        _ => None,
    }
}

/// Add the config reference a freshly cached item implies.
fn register(
    config: &mut PreparationConfig,
    item: &CacheItem,
    found: &Recognised,
    file_name: &str,
    cache_dir: &Path,
    project_root: &Path,
) {
    match (found.item_type, found.shape) {
        (CacheItemType::Package, Shape::File) => config.add_package(PackageReference {
            name: item.name.clone(),
            version: item.version.clone().unwrap_or_default(),
            source: item.path.clone(),
            target: format!("{}/{}", PACKAGES_TARGET, file_name),
        }),
        // referenced by stable name; the hash suffix is resolved at run time
        (CacheItemType::Package, Shape::Directory) => config.add_package(PackageReference {
            name: item.name.clone(),
            version: item.version.clone().unwrap_or_default(),
            source: fsops::relative_slash_path(project_root, &cache_dir.join(&item.name)),
            target: format!("{}/{}", PACKAGES_TARGET, item.name),
        }),
        (CacheItemType::Assembly, Shape::File) => config.add_assembly(AssemblyReference {
            name: item.name.clone(),
            version: item.version.clone(),
            source: item.path.clone(),
            target: format!("{}/{}", PLUGINS_TARGET, file_name),
        }),
        (CacheItemType::Assembly, Shape::Directory) => config.add_assembly(AssemblyReference {
            name: item.name.clone(),
            version: item.version.clone(),
            source: item.path.clone(),
            target: format!("{}/{}", PLUGINS_TARGET, item.name),
        }),
        (CacheItemType::Other, _) => {}
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, CacheError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| CacheError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()
        .map_err(|e| CacheError::io(dir, e))?;
    entries.sort();
    Ok(entries)
}

/// SHA-256 of a file's bytes as 64 lowercase hex characters.
pub fn compute_hash(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Locate a cache entry by stable name.
///
/// An exact match wins; otherwise the parent directory is searched for an
/// entry named `<base>` or `<base>@<anything>`, so a config can name
/// `cache/com.foo` while the cache holds `cache/com.foo@1a2b3c`.
pub fn resolve_cache_source(path: &Path) -> Option<PathBuf> {
    if path.exists() {
        return Some(path.to_path_buf());
    }

    let parent = path.parent()?;
    let base = path.file_name()?.to_str()?;
    let hashed_prefix = format!("{}@", base);

    let mut candidates: Vec<PathBuf> = fs::read_dir(parent)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name == base || name.starts_with(&hashed_prefix))
        })
        .map(|entry| entry.path())
        .collect();
    candidates.sort();

    let found = candidates.into_iter().next();
    if let Some(found) = &found {
        tracing::debug!(
            requested = %path.display(),
            resolved = %found.display(),
            "resolved cache source by name"
        );
    }
    found
}
