//! Orchestrated runs: ordering, failure rollback and standalone restore.

use build_prep::config::{
    AssetManipulation, AssetOperation, CodePatch, PackageReference, PatchType, PreparationConfig,
};
use build_prep::events::{EventLog, PrepEvent};
use build_prep::patcher::{PatcherSet, RollbackStore};
use build_prep::prepare::{PrepareError, PrepareOptions, Preparer, DEFAULT_BACKUP_DIR};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PLAYER: &str = "using System;\n\nnamespace Game\n{\n    public class Player\n    {\n        void Update()\n        {\n            Tick();\n        }\n\n        void Tick() { }\n    }\n}\n";

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let cache = root.join("build/preparation/cache");
    fs::create_dir_all(&cache).unwrap();
    fs::write(cache.join("com.demo.core-1.2.0.tgz"), "new package").unwrap();
    fs::create_dir_all(cache.join("com.demo.tools@9e1f00/Editor")).unwrap();
    fs::write(cache.join("com.demo.tools@9e1f00/package.json"), "{\"name\":\"tools\"}").unwrap();
    fs::write(cache.join("com.demo.tools@9e1f00/Editor/Menu.cs"), "class Menu {}").unwrap();

    let client = root.join("projects/client");
    fs::create_dir_all(client.join("Assets/Scripts")).unwrap();
    fs::create_dir_all(client.join("Packages")).unwrap();
    fs::write(client.join("Assets/Scripts/Player.cs"), PLAYER).unwrap();
    fs::write(client.join("Assets/Legacy.txt"), "legacy").unwrap();
    dir
}

fn preparer(root: &Path) -> Preparer {
    Preparer::new(root, PatcherSet::new(RollbackStore::new(root.join(".rollback"))))
}

fn no_validation() -> PrepareOptions {
    PrepareOptions {
        validate: false,
        ..Default::default()
    }
}

fn core_package() -> PackageReference {
    PackageReference {
        name: "com.demo.core".into(),
        version: "1.2.0".into(),
        source: "build/preparation/cache/com.demo.core-1.2.0.tgz".into(),
        target: "projects/client/Packages/com.demo.core-1.2.0.tgz".into(),
    }
}

#[test]
fn failed_patch_removes_freshly_copied_package() {
    let dir = project();
    let root = dir.path();
    let mut config = PreparationConfig::new();
    config.add_package(core_package());
    config.add_patch(missing_patch());

    let err = preparer(root)
        .run(&config, no_validation(), &mut EventLog::new())
        .unwrap_err();

    assert!(matches!(err, PrepareError::PatchTargetMissing(_)));
    assert!(!root.join("projects/client/Packages/com.demo.core-1.2.0.tgz").exists());
}

#[test]
fn failed_patch_restores_overwritten_package() {
    let dir = project();
    let root = dir.path();
    let target = root.join("projects/client/Packages/com.demo.core-1.2.0.tgz");
    fs::write(&target, "old package").unwrap();

    let mut config = PreparationConfig::new();
    config.add_package(core_package());
    config.add_patch(missing_patch());

    let mut log = EventLog::new();
    preparer(root).run(&config, no_validation(), &mut log).unwrap_err();

    assert_eq!(fs::read_to_string(&target).unwrap(), "old package");
    let events = log.events();
    assert!(events.iter().any(|e| matches!(e, PrepEvent::BackupCreated { .. })));
    assert!(events.iter().any(|e| matches!(e, PrepEvent::RolledBack { .. })));
    assert!(matches!(events.last(), Some(PrepEvent::Failed { .. })));
}

#[test]
fn every_mutated_path_is_restored_byte_for_byte() {
    let dir = project();
    let root = dir.path();
    let player = root.join("projects/client/Assets/Scripts/Player.cs");
    let legacy = root.join("projects/client/Assets/Legacy.txt");
    let tools = root.join("projects/client/Packages/com.demo.tools");
    fs::create_dir_all(&tools).unwrap();
    fs::write(tools.join("package.json"), "{\"name\":\"tools-old\"}").unwrap();

    let mut config = PreparationConfig::new();
    config.add_package(PackageReference {
        name: "com.demo.tools".into(),
        version: "9e1f00".into(),
        source: "build/preparation/cache/com.demo.tools".into(),
        target: "projects/client/Packages/com.demo.tools".into(),
    });
    config.add_asset_manipulation(AssetManipulation {
        operation: AssetOperation::Delete,
        source: None,
        target: "projects/client/Assets/Legacy.txt".into(),
        overwrite: false,
        description: None,
    });
    config.add_patch(
        CodePatch::new("projects/client/Assets/Scripts/Player.cs", PatchType::CSharp, "System")
            .with_operation("RemoveUsing"),
    );
    // Unbalanced replacement: rejected before it is written, failing the run.
    config.add_patch(
        CodePatch::new("projects/client/Assets/Scripts/Player.cs", PatchType::CSharp, "Tick();")
            .with_replace("Tick("),
    );

    let err = preparer(root)
        .run(&config, no_validation(), &mut EventLog::new())
        .unwrap_err();

    assert!(matches!(err, PrepareError::PatchFailed { .. }), "{err}");
    assert_eq!(fs::read_to_string(&player).unwrap(), PLAYER);
    assert_eq!(fs::read_to_string(&legacy).unwrap(), "legacy");
    assert_eq!(
        fs::read_to_string(tools.join("package.json")).unwrap(),
        "{\"name\":\"tools-old\"}"
    );
    assert!(!tools.join("Editor").exists());
    assert!(backup_dir_is_empty(root));
}

#[test]
fn hash_suffixed_directory_source_is_resolved() {
    let dir = project();
    let root = dir.path();
    let mut config = PreparationConfig::new();
    config.add_package(PackageReference {
        name: "com.demo.tools".into(),
        version: "9e1f00".into(),
        source: "build/preparation/cache/com.demo.tools".into(),
        target: "projects/client/Packages/com.demo.tools".into(),
    });

    let summary = preparer(root)
        .run(&config, PrepareOptions::default(), &mut EventLog::new())
        .unwrap();

    assert_eq!(summary.copied, 1);
    assert_eq!(
        fs::read_to_string(root.join("projects/client/Packages/com.demo.tools/Editor/Menu.cs"))
            .unwrap(),
        "class Menu {}"
    );
    assert!(backup_dir_is_empty(root));
}

#[test]
fn restore_from_kept_archive() {
    let dir = project();
    let root = dir.path();
    let player = root.join("projects/client/Assets/Scripts/Player.cs");
    let archive = build_prep::prepare::backup::create(
        root,
        &root.join("snapshots/manual"),
        &[player.clone()],
    )
    .unwrap();
    fs::rename(&archive.path, root.join("snapshots/manual/backup.zip")).unwrap();

    fs::write(&player, "// clobbered").unwrap();
    let restored = preparer(root)
        .restore(Some(&root.join("snapshots/manual")))
        .unwrap();

    assert_eq!(restored.restored, 1);
    assert_eq!(fs::read_to_string(&player).unwrap(), PLAYER);
}

fn missing_patch() -> CodePatch {
    CodePatch::new("projects/client/Assets/Scripts/Missing.cs", PatchType::CSharp, "Tick();")
}

fn backup_dir_is_empty(root: &Path) -> bool {
    let dir = root.join(DEFAULT_BACKUP_DIR);
    !dir.exists() || fs::read_dir(dir).unwrap().next().is_none()
}

#[test]
fn add_component_without_marker_fails_the_run() {
    let dir = project();
    let root = dir.path();
    let scene = root.join("projects/client/Assets/Scene.asset");
    let asset = "%YAML 1.1\n%TAG !u! tag:unity3d.com,2011:\n--- !u!1 &100\nGameObject:\n  m_Name: Root\n";
    fs::write(&scene, asset).unwrap();

    let mut config = PreparationConfig::new();
    config.add_package(core_package());
    config.add_patch(
        CodePatch::new("projects/client/Assets/Scene.asset", PatchType::UnityAsset, "m_Missing:")
            .with_operation("AddComponent")
            .with_replace("  - component: {fileID: 9}"),
    );

    let err = preparer(root)
        .run(&config, no_validation(), &mut EventLog::new())
        .unwrap_err();

    assert!(matches!(err, PrepareError::PatchTargetNotFound(_)), "{err}");
    assert_eq!(fs::read_to_string(&scene).unwrap(), asset);
    assert!(!root.join("projects/client/Packages/com.demo.core-1.2.0.tgz").exists());
}

#[test]
fn rollback_restores_hash_suffixed_move_source() {
    let dir = project();
    let root = dir.path();
    let cached = root.join("build/preparation/cache/com.demo.tools@9e1f00");

    let mut config = PreparationConfig::new();
    config.add_asset_manipulation(AssetManipulation {
        operation: AssetOperation::Move,
        source: Some("build/preparation/cache/com.demo.tools".into()),
        target: "projects/client/Packages/com.demo.tools".into(),
        overwrite: false,
        description: None,
    });
    config.add_patch(missing_patch());

    let err = preparer(root)
        .run(&config, no_validation(), &mut EventLog::new())
        .unwrap_err();

    assert!(matches!(err, PrepareError::PatchTargetMissing(_)));
    assert_eq!(fs::read_to_string(cached.join("Editor/Menu.cs")).unwrap(), "class Menu {}");
    assert_eq!(
        fs::read_to_string(cached.join("package.json")).unwrap(),
        "{\"name\":\"tools\"}"
    );
    assert!(!root.join("projects/client/Packages/com.demo.tools").exists());
}
