//! Cache population from a vendor drop.

use build_prep::cache::{compute_hash, CacheItemType, ContentCache};
use build_prep::config::PreparationConfig;
use std::fs;
use tempfile::TempDir;

fn vendor_drop(root: &std::path::Path) -> std::path::PathBuf {
    let vendor = root.join("vendor");
    fs::create_dir_all(&vendor).unwrap();
    fs::write(vendor.join("com.demo.core-1.2.0.tgz"), b"core package bytes").unwrap();
    fs::write(vendor.join("com.demo.ui-0.9.1.tgz"), b"ui package bytes").unwrap();
    fs::write(vendor.join("Newtonsoft.Json.dll"), b"MZ assembly").unwrap();
    fs::write(vendor.join("README.md"), b"not an artifact").unwrap();
    vendor
}

#[test]
fn two_packages_and_one_assembly() {
    let dir = TempDir::new().unwrap();
    let vendor = vendor_drop(dir.path());
    let cache = ContentCache::with_default_dir(dir.path());

    let items = cache.populate_from_directory(&vendor, None).unwrap();
    assert_eq!(items.len(), 3);

    let mut packages: Vec<(&str, Option<&str>)> = items
        .iter()
        .filter(|i| i.item_type == CacheItemType::Package)
        .map(|i| (i.name.as_str(), i.version.as_deref()))
        .collect();
    packages.sort();
    assert_eq!(
        packages,
        vec![("com.demo.core", Some("1.2.0")), ("com.demo.ui", Some("0.9.1"))]
    );

    let assembly = items
        .iter()
        .find(|i| i.item_type == CacheItemType::Assembly)
        .unwrap();
    assert_eq!(assembly.name, "Newtonsoft.Json");

    for item in &items {
        let hash = item.hash.as_deref().unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(item.path.starts_with("build/preparation/cache/"));
        assert_eq!(item.source.as_deref(), Some("vendor"));
    }
    assert!(cache.dir().join("com.demo.ui-0.9.1.tgz").is_file());
}

#[test]
fn population_registers_references() {
    let dir = TempDir::new().unwrap();
    let vendor = vendor_drop(dir.path());
    let cache = ContentCache::with_default_dir(dir.path());
    let mut config = PreparationConfig::new();

    cache.populate_from_directory(&vendor, Some(&mut config)).unwrap();

    assert_eq!(config.packages.len(), 2);
    assert_eq!(config.assemblies.len(), 1);
    let core = config
        .packages
        .iter()
        .find(|p| p.name == "com.demo.core")
        .unwrap();
    assert_eq!(core.source, "build/preparation/cache/com.demo.core-1.2.0.tgz");
    assert_eq!(core.target, "projects/client/Packages/com.demo.core-1.2.0.tgz");
    assert_eq!(
        config.assemblies[0].target,
        "projects/client/Assets/Plugins/Newtonsoft.Json.dll"
    );
}

#[test]
fn hashes_are_stable_and_directories_carry_none() {
    let dir = TempDir::new().unwrap();
    let vendor = vendor_drop(dir.path());
    let hashed = vendor.join("com.demo.tools@4f2a9c");
    fs::create_dir_all(&hashed).unwrap();
    fs::write(hashed.join("package.json"), "{}").unwrap();

    let cache = ContentCache::with_default_dir(dir.path());
    cache.populate_from_directory(&vendor, None).unwrap();

    let file = vendor.join("com.demo.core-1.2.0.tgz");
    assert_eq!(compute_hash(&file).unwrap(), compute_hash(&file).unwrap());

    let listed = cache.list().unwrap();
    let tools = listed.iter().find(|i| i.name == "com.demo.tools").unwrap();
    assert!(tools.is_directory());
    assert_eq!(tools.size, 2);

    assert_eq!(cache.clean().unwrap(), 3);
    let remaining = cache.list().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "com.demo.tools");
}

#[test]
fn nested_artifacts_are_found_but_item_directories_stay_whole() {
    let dir = TempDir::new().unwrap();
    let vendor = vendor_drop(dir.path());
    fs::create_dir_all(vendor.join("unity/extra")).unwrap();
    fs::write(vendor.join("unity/extra/com.demo.audio-2.0.0.tgz"), b"audio").unwrap();
    fs::create_dir_all(vendor.join("libs")).unwrap();
    fs::write(vendor.join("libs/Serilog.dll"), b"MZ serilog").unwrap();
    let hashed = vendor.join("com.demo.tools@4f2a9c");
    fs::create_dir_all(hashed.join("Samples")).unwrap();
    fs::write(hashed.join("Samples/sample-0.1.0.tgz"), b"inner").unwrap();

    let cache = ContentCache::with_default_dir(dir.path());
    let items = cache.populate_from_directory(&vendor, None).unwrap();

    let mut names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "Newtonsoft.Json",
            "Serilog",
            "com.demo.audio",
            "com.demo.core",
            "com.demo.tools",
            "com.demo.ui",
        ]
    );
    assert!(cache.dir().join("com.demo.audio-2.0.0.tgz").is_file());
    assert!(cache.dir().join("com.demo.tools@4f2a9c/Samples/sample-0.1.0.tgz").is_file());
    assert!(!cache.dir().join("sample-0.1.0.tgz").exists());
}
