//! Batch source collection and injection from a [`BatchManifest`].

use crate::cache::DEFAULT_CACHE_DIR;
use crate::config::PreparationConfig;
use crate::manifest::{BatchAssetItem, BatchItem, BatchManifest, ItemType, PreparationManifest};
use crate::sources::{add_injection, SourceError, SourceManager};

const DEFAULT_PACKAGE_TARGET: &str = "projects/client/Packages";
const DEFAULT_ASSEMBLY_TARGET: &str = "projects/client/Assets/Plugins";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    pub dry_run: bool,
    pub continue_on_error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub item: String,
    pub error: String,
}

/// Per-item outcome of a batch. `success_count + failure_count` is the
/// number of items actually attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub successful_items: Vec<String>,
    pub failed_items: Vec<FailedItem>,
}

impl BatchResult {
    pub fn attempted(&self) -> usize {
        self.success_count + self.failure_count
    }

    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }

    fn record(&mut self, label: String, outcome: Result<(), SourceError>) -> bool {
        match outcome {
            Ok(()) => {
                self.success_count += 1;
                self.successful_items.push(label);
                true
            }
            Err(e) => {
                tracing::error!(item = %label, "batch item failed: {}", e);
                self.failure_count += 1;
                self.failed_items.push(FailedItem {
                    item: label,
                    error: e.to_string(),
                });
                false
            }
        }
    }
}

pub struct BatchProcessor {
    sources: SourceManager,
    cache_dir: String,
}

impl BatchProcessor {
    pub fn new(sources: SourceManager) -> Self {
        Self {
            sources,
            cache_dir: DEFAULT_CACHE_DIR.to_string(),
        }
    }

    /// Cache directory injections point into.
    pub fn with_cache_dir(mut self, cache_dir: impl Into<String>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Add every batch entry to `target` through [`SourceManager::add_source`].
    pub fn process_sources(
        &self,
        batch: &BatchManifest,
        target: &mut PreparationManifest,
        options: BatchOptions,
    ) -> BatchResult {
        let mut result = BatchResult::default();
        let mut add = |label: String, source: &str, cache_as: &str, item_type: ItemType| {
            let outcome = self
                .sources
                .add_source(target, source, cache_as, item_type, options.dry_run)
                .map(|_| ());
            result.record(label, outcome) || options.continue_on_error
        };

        let proceed = batch.packages.iter().all(|item| {
            add(label("Package", &item.name), &item.source, &item.cache_key(), ItemType::Package)
        }) && batch.assemblies.iter().all(|item| {
            add(label("Assembly", &item.name), &item.source, &item.cache_key(), ItemType::Assembly)
        }) && batch
            .assets
            .iter()
            .all(|item| add(label("Asset", &item.name), &item.source, &item.name, ItemType::Asset));

        log_summary("sources", &result, proceed);
        result
    }

    /// Register cache-to-target mappings for every batch entry in `config`.
    /// A dry run works on a copy so failures are still reported.
    pub fn process_injections(
        &self,
        batch: &BatchManifest,
        config: &mut PreparationConfig,
        options: BatchOptions,
    ) -> BatchResult {
        let mut scratch = options.dry_run.then(|| config.clone());
        let working = scratch.as_mut().unwrap_or(config);

        let mut result = BatchResult::default();
        let cache_dir = self.cache_dir.trim_end_matches('/');
        let mut inject = |label: String, outcome: Result<(), SourceError>| {
            result.record(label, outcome) || options.continue_on_error
        };

        let proceed = batch.packages.iter().all(|item| {
            let outcome =
                inject_item(working, cache_dir, item, ItemType::Package, DEFAULT_PACKAGE_TARGET);
            inject(label("Package", &item.name), outcome)
        }) && batch.assemblies.iter().all(|item| {
            let outcome =
                inject_item(working, cache_dir, item, ItemType::Assembly, DEFAULT_ASSEMBLY_TARGET);
            inject(label("Assembly", &item.name), outcome)
        }) && batch.assets.iter().all(|item| {
            let outcome = inject_asset(working, cache_dir, item);
            inject(label("Asset", &item.name), outcome)
        });

        log_summary("injections", &result, proceed);
        result
    }
}

fn label(kind: &str, name: &str) -> String {
    format!("{}: {}", kind, name)
}

fn inject_item(
    config: &mut PreparationConfig,
    cache_dir: &str,
    item: &BatchItem,
    item_type: ItemType,
    default_target_dir: &str,
) -> Result<(), SourceError> {
    if item.name.trim().is_empty() {
        return Err(SourceError::MissingField("Name"));
    }
    let cache_path = format!("{}/{}", cache_dir, item.cache_key());
    let target = item
        .target
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| format!("{}/{}", default_target_dir, item.name));
    add_injection(
        config,
        &cache_path,
        &target,
        item_type,
        Some(&item.name),
        item.version.as_deref(),
    )
}

fn inject_asset(
    config: &mut PreparationConfig,
    cache_dir: &str,
    item: &BatchAssetItem,
) -> Result<(), SourceError> {
    if item.name.trim().is_empty() {
        return Err(SourceError::MissingField("Name"));
    }
    let cache_path = format!("{}/{}", cache_dir, item.name);
    add_injection(config, &cache_path, &item.target, ItemType::Asset, Some(&item.name), None)
}

fn log_summary(what: &str, result: &BatchResult, completed: bool) {
    if completed {
        tracing::info!(
            succeeded = result.success_count,
            failed = result.failure_count,
            "batch {} processed",
            what
        );
    } else {
        tracing::warn!(
            succeeded = result.success_count,
            failed = result.failure_count,
            "batch {} stopped at first failure",
            what
        );
    }
}
