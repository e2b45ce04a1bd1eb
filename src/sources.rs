//! Collecting sources into the cache and mapping cached items onto
//! project targets.

use crate::config::{
    AssemblyReference, AssetManipulation, AssetOperation, PackageReference, PreparationConfig,
};
use crate::fsops::{self, TreeStats};
use crate::manifest::{ItemType, PreparationItem, PreparationManifest};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Version recorded for a package injection that names none.
pub const DEFAULT_PACKAGE_VERSION: &str = "1.0.0";

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source path does not exist: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Cache name must not be empty")]
    EmptyCacheName,

    #[error("Item with cacheAs '{0}' already exists in manifest")]
    Duplicate(String),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Failed to copy {} into the cache: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What [`SourceManager::add_source`] did, or would do on a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAddition {
    pub source_path: PathBuf,
    pub cache_path: PathBuf,
    /// Project-relative cache location, `/`-separated
    pub cache_relative_path: String,
    pub dry_run: bool,
    pub stats: TreeStats,
}

/// Copies sources into a manifest's cache directory.
#[derive(Debug, Clone)]
pub struct SourceManager {
    project_root: PathBuf,
}

impl SourceManager {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Relative paths are taken from the project root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Copy `source` (file or directory) to `<cache dir>/<cache_as>` and record
    /// it in `manifest`. A dry run only measures the source; neither the cache
    /// nor the manifest changes.
    pub fn add_source(
        &self,
        manifest: &mut PreparationManifest,
        source: &str,
        cache_as: &str,
        item_type: ItemType,
        dry_run: bool,
    ) -> Result<SourceAddition, SourceError> {
        let source_path = self.resolve(source);
        if !source_path.exists() {
            return Err(SourceError::SourceNotFound(source_path));
        }
        if cache_as.trim().is_empty() {
            return Err(SourceError::EmptyCacheName);
        }
        if manifest.find_item(cache_as).is_some() {
            return Err(SourceError::Duplicate(cache_as.to_string()));
        }

        let cache_relative_path =
            format!("{}/{}", manifest.cache_dir().trim_end_matches('/'), cache_as);
        let cache_path = self.project_root.join(&cache_relative_path);
        let stats = fsops::tree_stats(&source_path).map_err(|source| SourceError::Io {
            path: source_path.clone(),
            source,
        })?;

        let addition = SourceAddition {
            source_path,
            cache_path,
            cache_relative_path,
            dry_run,
            stats,
        };

        if dry_run {
            tracing::info!(
                cache_as,
                files = stats.files,
                dirs = stats.dirs,
                bytes = stats.bytes,
                "[dry-run] would add source"
            );
            return Ok(addition);
        }

        fsops::copy_path(&addition.source_path, &addition.cache_path).map_err(|source| {
            SourceError::Io {
                path: addition.source_path.clone(),
                source,
            }
        })?;
        manifest.items.push(PreparationItem {
            source: source.to_string(),
            cache_as: cache_as.to_string(),
            item_type,
        });
        tracing::info!(cache_as, %item_type, "added source to manifest");
        Ok(addition)
    }
}

/// Map a cached item onto a project target in `config`.
///
/// Packages default their name to the cache path's file name and their
/// version to [`DEFAULT_PACKAGE_VERSION`]; assets become an overwriting Copy.
pub fn add_injection(
    config: &mut PreparationConfig,
    cache_path: &str,
    target: &str,
    item_type: ItemType,
    name: Option<&str>,
    version: Option<&str>,
) -> Result<(), SourceError> {
    if cache_path.trim().is_empty() {
        return Err(SourceError::MissingField("Cache path"));
    }
    if target.trim().is_empty() {
        return Err(SourceError::MissingField("Target path"));
    }
    let name = name
        .filter(|n| !n.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_name(cache_path));

    match item_type {
        ItemType::Package => {
            config.add_package(PackageReference {
                name: name.clone(),
                version: version.unwrap_or(DEFAULT_PACKAGE_VERSION).to_string(),
                source: cache_path.to_string(),
                target: target.to_string(),
            });
            tracing::info!(%name, "added package injection");
        }
        ItemType::Assembly => {
            config.add_assembly(AssemblyReference {
                name: name.clone(),
                version: version.map(str::to_string),
                source: cache_path.to_string(),
                target: target.to_string(),
            });
            tracing::info!(%name, "added assembly injection");
        }
        ItemType::Asset => {
            config.add_asset_manipulation(AssetManipulation {
                operation: AssetOperation::Copy,
                source: Some(cache_path.to_string()),
                target: target.to_string(),
                overwrite: true,
                description: None,
            });
            tracing::info!(source = cache_path, target, "added asset injection");
        }
    }
    Ok(())
}

fn default_name(cache_path: &str) -> String {
    cache_path
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(cache_path)
        .to_string()
}
