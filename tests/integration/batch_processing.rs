//! Batch manifests driving source collection and injection.

use build_prep::batch::{BatchOptions, BatchProcessor};
use build_prep::config::{AssetOperation, PreparationConfig};
use build_prep::manifest::{BatchManifest, PreparationManifest};
use build_prep::sources::SourceManager;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const BATCH: &str = r#"
version: "1.0"
description: Vendor drop
packages:
  - source: vendor/core
    name: com.demo.core
    version: 1.2.0
  - source: vendor/missing
    name: com.demo.missing
    version: 0.1.0
  - source: vendor/ui
    name: com.demo.ui
assemblies:
  - source: vendor/Newtonsoft.Json.dll
    name: Newtonsoft.Json
assets:
  - source: vendor/Logo.png
    name: Logo.png
    target: projects/client/Assets/Art/Logo.png
"#;

fn workspace() -> (TempDir, BatchManifest) {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("vendor/core/Runtime")).unwrap();
    fs::write(root.join("vendor/core/package.json"), "{}").unwrap();
    fs::write(root.join("vendor/core/Runtime/Core.cs"), "class Core {}").unwrap();
    fs::create_dir_all(root.join("vendor/ui")).unwrap();
    fs::write(root.join("vendor/ui/package.json"), "{}").unwrap();
    fs::write(root.join("vendor/Newtonsoft.Json.dll"), [0u8, 1, 2]).unwrap();
    fs::write(root.join("vendor/Logo.png"), [137u8, 80, 78, 71]).unwrap();

    let path = root.join("batch.yaml");
    fs::write(&path, BATCH).unwrap();
    let batch = BatchManifest::load(&path).unwrap();
    (dir, batch)
}

fn processor(root: &Path) -> BatchProcessor {
    BatchProcessor::new(SourceManager::new(root))
}

#[test]
fn yaml_manifest_validates_with_warning() {
    let (_dir, batch) = workspace();
    assert_eq!(batch.total_items(), 5);

    let validation = batch.validate();
    assert!(validation.is_valid());
    assert_eq!(validation.warnings, vec!["Package 'com.demo.ui': Version not specified"]);
}

#[test]
fn continue_on_error_processes_every_item() {
    let (dir, batch) = workspace();
    let root = dir.path();
    let mut manifest = PreparationManifest::new("vendor-drop");

    let result = processor(root).process_sources(
        &batch,
        &mut manifest,
        BatchOptions {
            continue_on_error: true,
            ..Default::default()
        },
    );

    assert_eq!(result.success_count, 4);
    assert_eq!(result.failure_count, 1);
    assert_eq!(result.failed_items[0].item, "Package: com.demo.missing");
    assert!(result.failed_items[0].error.starts_with("Source path does not exist"));
    assert_eq!(
        result.successful_items,
        vec![
            "Package: com.demo.core",
            "Package: com.demo.ui",
            "Assembly: Newtonsoft.Json",
            "Asset: Logo.png",
        ]
    );

    assert_eq!(manifest.items.len(), 4);
    let cache = root.join(manifest.cache_dir());
    assert_eq!(
        fs::read_to_string(cache.join("com.demo.core-1.2.0/Runtime/Core.cs")).unwrap(),
        "class Core {}"
    );
    assert!(cache.join("com.demo.ui/package.json").is_file());
    assert!(cache.join("Newtonsoft.Json").is_file());
}

#[test]
fn fail_fast_stops_at_first_failure() {
    let (dir, batch) = workspace();
    let mut manifest = PreparationManifest::new("vendor-drop");

    let result =
        processor(dir.path()).process_sources(&batch, &mut manifest, BatchOptions::default());

    assert_eq!(result.success_count, 1);
    assert_eq!(result.failure_count, 1);
    assert!(result.attempted() <= batch.total_items());
    assert!(!result.is_success());
    assert_eq!(manifest.items.len(), 1);
}

#[test]
fn dry_run_sources_touch_nothing() {
    let (dir, batch) = workspace();
    let mut manifest = PreparationManifest::new("vendor-drop");

    let result = processor(dir.path()).process_sources(
        &batch,
        &mut manifest,
        BatchOptions {
            dry_run: true,
            continue_on_error: true,
        },
    );

    assert_eq!(result.success_count, 4);
    assert!(manifest.items.is_empty());
    assert!(!dir.path().join(manifest.cache_dir()).exists());
}

#[test]
fn injections_fill_config_with_default_targets() {
    let (dir, batch) = workspace();
    let mut config = PreparationConfig::new();

    let result =
        processor(dir.path()).process_injections(&batch, &mut config, BatchOptions::default());

    assert!(result.is_success());
    assert_eq!(result.attempted(), batch.total_items());
    assert_eq!(config.packages.len(), 3);
    assert_eq!(config.packages[0].source, "build/preparation/cache/com.demo.core-1.2.0");
    assert_eq!(config.packages[0].target, "projects/client/Packages/com.demo.core");
    assert_eq!(config.packages[2].version, "1.0.0");
    assert_eq!(config.assemblies[0].target, "projects/client/Assets/Plugins/Newtonsoft.Json");

    let asset = &config.asset_manipulations[0];
    assert_eq!(asset.operation, AssetOperation::Copy);
    assert!(asset.overwrite);
    assert_eq!(asset.target, "projects/client/Assets/Art/Logo.png");
}
