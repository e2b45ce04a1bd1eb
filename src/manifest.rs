//! Source-collection manifests.
//!
//! A [`PreparationManifest`] records what has been copied into the cache and
//! under which name; a [`BatchManifest`] lists many sources to add in one pass.

use crate::cache::DEFAULT_CACHE_DIR;
use crate::edit::write_creating_dirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to access manifest {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest JSON ({}): {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse manifest YAML ({}): {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Unsupported manifest format '{0}'. Use .json, .yaml, or .yml")]
    UnsupportedFormat(String),
}

/// Kind of a collected source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[serde(alias = "Package")]
    Package,
    #[serde(alias = "Assembly")]
    Assembly,
    #[serde(alias = "Asset")]
    Asset,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemType::Package => "package",
            ItemType::Assembly => "assembly",
            ItemType::Asset => "asset",
        };
        f.write_str(name)
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "package" => Ok(ItemType::Package),
            "assembly" => Ok(ItemType::Assembly),
            "asset" => Ok(ItemType::Asset),
            _ => Err(format!(
                "Unknown type: {}. Must be 'package', 'assembly', or 'asset'.",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparationItem {
    pub source: String,
    pub cache_as: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparationManifest {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_directory: Option<String>,
    #[serde(default)]
    pub items: Vec<PreparationItem>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl PreparationManifest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            id: id.into(),
            title: "Preparation Manifest".to_string(),
            description: None,
            cache_directory: Some(DEFAULT_CACHE_DIR.to_string()),
            items: Vec::new(),
        }
    }

    /// Project-relative cache directory items are copied into.
    pub fn cache_dir(&self) -> &str {
        self.cache_directory.as_deref().unwrap_or(DEFAULT_CACHE_DIR)
    }

    /// Item registered under `cache_as`, compared case-insensitively.
    pub fn find_item(&self, cache_as: &str) -> Option<&PreparationItem> {
        self.items
            .iter()
            .find(|item| item.cache_as.eq_ignore_ascii_case(cache_as))
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ManifestError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`, or start an empty manifest named after its file stem.
    pub fn load_or_create(path: &Path) -> Result<Self, ManifestError> {
        if path.exists() {
            return Self::load(path);
        }
        tracing::info!(path = %path.display(), "manifest not found, creating new");
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(id))
    }

    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let mut json = serde_json::to_string_pretty(self).map_err(|source| ManifestError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        json.push('\n');
        write_creating_dirs(path, json.as_bytes()).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "saved manifest");
        Ok(())
    }
}

/// Package or assembly entry of a batch manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl BatchItem {
    /// `name`, or `name-version` when a version is given.
    pub fn cache_key(&self) -> String {
        match self.version.as_deref().map(str::trim) {
            Some(version) if !version.is_empty() => format!("{}-{}", self.name, version),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAssetItem {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchManifest {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub packages: Vec<BatchItem>,
    #[serde(default)]
    pub assemblies: Vec<BatchItem>,
    #[serde(default)]
    pub assets: Vec<BatchAssetItem>,
}

/// Findings of [`BatchManifest::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl BatchValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl BatchManifest {
    /// Parse by extension: `.json`, `.yaml` or `.yml`.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if !matches!(extension.as_str(), "json" | "yaml" | "yml") {
            return Err(ManifestError::UnsupportedFormat(format!(".{}", extension)));
        }

        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Self = if extension == "json" {
            serde_json::from_str(&content).map_err(|source| ManifestError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            serde_yaml_ng::from_str(&content).map_err(|source| ManifestError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        };

        tracing::info!(
            packages = manifest.packages.len(),
            assemblies = manifest.assemblies.len(),
            assets = manifest.assets.len(),
            "loaded batch manifest"
        );
        Ok(manifest)
    }

    pub fn total_items(&self) -> usize {
        self.packages.len() + self.assemblies.len() + self.assets.len()
    }

    pub fn validate(&self) -> BatchValidation {
        let mut result = BatchValidation::default();

        if self.version.trim().is_empty() {
            result.errors.push("Manifest version is required".to_string());
        }
        if self.total_items() == 0 {
            result.warnings.push("Manifest contains no items".to_string());
        }

        for package in &self.packages {
            check_item("Package", package, &mut result);
            if package.version.as_deref().map_or(true, |v| v.trim().is_empty()) {
                result
                    .warnings
                    .push(format!("Package '{}': Version not specified", package.name));
            }
        }
        for assembly in &self.assemblies {
            check_item("Assembly", assembly, &mut result);
        }
        for asset in &self.assets {
            if asset.source.trim().is_empty() {
                result
                    .errors
                    .push(format!("Asset '{}': Source path is required", asset.name));
            }
            if asset.name.trim().is_empty() {
                result.errors.push("Asset: Name is required".to_string());
            }
            if asset.target.trim().is_empty() {
                result
                    .errors
                    .push(format!("Asset '{}': Target path is required", asset.name));
            }
        }

        warn_duplicates("Package", self.packages.iter().map(|p| p.name.as_str()), &mut result);
        warn_duplicates("Assembly", self.assemblies.iter().map(|a| a.name.as_str()), &mut result);
        warn_duplicates("Asset", self.assets.iter().map(|a| a.name.as_str()), &mut result);

        if result.is_valid() {
            tracing::info!("batch manifest validation passed");
        } else {
            tracing::warn!(errors = result.errors.len(), "batch manifest validation failed");
        }
        result
    }
}

fn check_item(kind: &str, item: &BatchItem, result: &mut BatchValidation) {
    if item.source.trim().is_empty() {
        result
            .errors
            .push(format!("{} '{}': Source path is required", kind, item.name));
    }
    if item.name.trim().is_empty() {
        result.errors.push(format!("{}: Name is required", kind));
    }
}

fn warn_duplicates<'a>(
    kind: &str,
    names: impl Iterator<Item = &'a str>,
    result: &mut BatchValidation,
) {
    let mut seen = std::collections::HashSet::new();
    for name in names.filter(|n| !n.trim().is_empty()) {
        if !seen.insert(name) {
            result
                .warnings
                .push(format!("{} '{}' is listed more than once", kind, name));
        }
    }
}
