//! Patcher scenarios driven through the registry, as the orchestrator uses it.

use build_prep::config::{CodePatch, PatchMode, PatchType};
use build_prep::patcher::{PatcherSet, RollbackStore};
use std::fs;
use tempfile::TempDir;

fn patchers(dir: &TempDir) -> PatcherSet {
    PatcherSet::new(RollbackStore::new(dir.path().join(".rollback")))
}

#[test]
fn remove_using_leaves_two_imports() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("Bootstrap.cs");
    fs::write(
        &file,
        "using System;\nusing System.Collections.Generic;\nusing System.Linq;\n\nnamespace Game\n{\n    public static class Bootstrap\n    {\n        public static int Count(List<int> xs) => xs.Count;\n    }\n}\n",
    )
    .unwrap();

    let set = patchers(&dir);
    let patch = CodePatch::new("Bootstrap.cs", PatchType::CSharp, "System.Linq")
        .with_operation("RemoveUsing");
    let patcher = set.get(PatchType::CSharp).unwrap();

    let validation = patcher.validate(&file, &patch);
    assert!(validation.is_valid);
    assert!(validation.target_found);

    let outcome = patcher.apply(&file, &patch, false);
    assert!(outcome.success, "{}", outcome.message);
    assert!(outcome.modified);

    let patched = fs::read_to_string(&file).unwrap();
    let usings: Vec<&str> = patched.lines().filter(|l| l.starts_with("using ")).collect();
    assert_eq!(usings, vec!["using System;", "using System.Collections.Generic;"]);
    assert!(!patched.contains("System.Linq"));
}

#[test]
fn json_add_property_at_root() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("package.json");
    fs::write(&file, r#"{"name":"test","version":"1.0.0"}"#).unwrap();

    let set = patchers(&dir);
    let patch = CodePatch::new("package.json", PatchType::Json, "")
        .with_operation("AddProperty")
        .with_replace("description:A test package");
    let outcome = set.get(PatchType::Json).unwrap().apply(&file, &patch, false);
    assert!(outcome.success, "{}", outcome.message);

    let patched = fs::read_to_string(&file).unwrap();
    assert!(patched.contains(r#""description":"A test package""#));
    let doc: serde_json::Value = serde_json::from_str(&patched).unwrap();
    assert_eq!(doc["name"], "test");
    assert_eq!(doc["version"], "1.0.0");
}

#[test]
fn rollback_restores_pre_image() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("ProjectSettings.asset");
    let original = "%YAML 1.1\n%TAG !u! tag:unity3d.com,2011:\n--- !u!129 &1\nPlayerSettings:\n  companyName: Acme\n  productName: Demo\n";
    fs::write(&file, original).unwrap();

    let set = patchers(&dir);
    let patcher = set.get(PatchType::UnityAsset).unwrap();
    let patch = CodePatch::new("ProjectSettings.asset", PatchType::UnityAsset, "productName")
        .with_operation("ModifyProperty")
        .with_replace("Demo Release");

    let outcome = patcher.apply(&file, &patch, false);
    assert!(outcome.success, "{}", outcome.message);
    assert!(fs::read_to_string(&file).unwrap().contains("  productName: Demo Release\n"));

    let id = outcome.rollback_id.expect("written patches carry a rollback id");
    assert!(patcher.rollback(&file, &id));
    assert_eq!(fs::read_to_string(&file).unwrap(), original);
    patcher.cleanup_rollback(&id);
    assert!(!patcher.rollback(&file, &id));
}

#[test]
fn text_insert_modes_and_dry_run_preview() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("build.cfg");
    fs::write(&file, "mode=debug\n").unwrap();

    let set = patchers(&dir);
    let patcher = set.get(PatchType::Text).unwrap();
    let patch = CodePatch::new("build.cfg", PatchType::Text, "mode=debug")
        .with_mode(PatchMode::InsertAfter)
        .with_replace("\nstrip=true");

    let preview = patcher.apply(&file, &patch, true);
    assert!(preview.success);
    assert!(preview.preview.unwrap().contains("+strip=true"));
    assert_eq!(fs::read_to_string(&file).unwrap(), "mode=debug\n");

    let outcome = patcher.apply(&file, &patch, false);
    assert!(outcome.success);
    assert_eq!(fs::read_to_string(&file).unwrap(), "mode=debug\nstrip=true\n");
}
