//! Property checks over generated inputs.

use build_prep::cache::compute_hash;
use build_prep::config::{CodePatch, PatchMode, PatchType};
use build_prep::patcher::text::substitute;
use build_prep::patcher::{
    CSharpPatcher, JsonPatcher, Patcher, RollbackStore, TextPatcher, UnityAssetPatcher,
};
use proptest::prelude::*;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;

/// Lowercase words and spaces; never mistaken for a regex.
fn arb_text() -> impl Strategy<Value = String> {
    "[a-z \n]{0,80}"
}

fn arb_word() -> impl Strategy<Value = String> {
    "[a-z]{1,4}"
}

const SETTINGS_ASSET: &str = "%YAML 1.1\n%TAG !u! tag:unity3d.com,2011:\n--- !u!114 &11400000\nMonoBehaviour:\n  m_Name: Settings\n  level: 1\n";

/// A flat JSON object with at least one key.
fn arb_object() -> impl Strategy<Value = BTreeMap<String, i64>> {
    prop::collection::btree_map("[a-z]{1,6}", -1000i64..1000, 1..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn delete_leaves_no_occurrence(content in arb_text(), search in arb_word()) {
        let patched = substitute(&content, &search, "", PatchMode::Delete).unwrap();
        prop_assert!(!patched.contains(&search));
    }

    #[test]
    fn dry_run_never_writes(content in arb_text(), search in arb_word(), replace in arb_word()) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, &content).unwrap();

        let patcher = TextPatcher::new(RollbackStore::new(dir.path().join(".rollback")));
        let patch = CodePatch::new("notes.txt", PatchType::Text, search).with_replace(replace);
        let outcome = patcher.apply(&file, &patch, true);

        prop_assert!(outcome.success);
        prop_assert!(outcome.rollback_id.is_none());
        prop_assert_eq!(fs::read_to_string(&file).unwrap(), content);
    }

    #[test]
    fn structured_dry_runs_never_write(value in -1000i64..1000, name in "[A-Za-z]{1,8}") {
        let dir = tempfile::tempdir().unwrap();
        let rollback = RollbackStore::new(dir.path().join(".rollback"));
        let cases: Vec<(Box<dyn Patcher>, &str, String, CodePatch)> = vec![
            (
                Box::new(JsonPatcher::new(rollback.clone())),
                "settings.json",
                "{\n  \"analytics\": {\n    \"level\": 1\n  }\n}\n".to_string(),
                CodePatch::new("settings.json", PatchType::Json, "analytics.level")
                    .with_operation("ReplaceValue")
                    .with_replace(value.to_string()),
            ),
            (
                Box::new(CSharpPatcher::new(rollback.clone())),
                "Player.cs",
                "class Player\n{\n    int level = 1;\n}\n".to_string(),
                CodePatch::new("Player.cs", PatchType::CSharp, "1")
                    .with_operation("ReplaceExpression")
                    .with_replace(value.to_string()),
            ),
            (
                Box::new(UnityAssetPatcher::new(rollback)),
                "Settings.asset",
                SETTINGS_ASSET.to_string(),
                CodePatch::new("Settings.asset", PatchType::UnityAsset, "m_Name")
                    .with_operation("ModifyProperty")
                    .with_replace(name.clone()),
            ),
        ];

        for (patcher, file_name, content, patch) in cases {
            let file = dir.path().join(file_name);
            fs::write(&file, &content).unwrap();

            let outcome = patcher.apply(&file, &patch, true);

            prop_assert!(outcome.success, "{}: {}", file_name, outcome.message);
            prop_assert!(outcome.rollback_id.is_none());
            prop_assert_eq!(fs::read_to_string(&file).unwrap(), content);
        }
    }

    #[test]
    fn content_hash_is_stable_hex(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("blob.bin");
        fs::write(&file, &bytes).unwrap();

        let first = compute_hash(&file).unwrap();
        prop_assert_eq!(first.len(), 64);
        prop_assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        prop_assert_eq!(compute_hash(&file).unwrap(), first);
    }

    #[test]
    fn replace_value_keeps_siblings(
        object in arb_object(),
        pick in any::<prop::sample::Index>(),
        value in -1000i64..1000,
    ) {
        let keys: Vec<&String> = object.keys().collect();
        let key = keys[pick.index(keys.len())].clone();
        let doc: Map<String, Value> =
            object.iter().map(|(k, v)| (k.clone(), Value::from(*v))).collect();
        let content = serde_json::to_string_pretty(&Value::Object(doc)).unwrap();

        let patcher = JsonPatcher::new(RollbackStore::in_temp_dir());
        let patch = CodePatch::new("settings.json", PatchType::Json, key.clone())
            .with_operation("ReplaceValue")
            .with_replace(value.to_string());
        let patched = patcher.transform(&content, &patch).unwrap();
        let patched: Value = serde_json::from_str(&patched).unwrap();

        prop_assert_eq!(&patched[key.as_str()], &Value::from(value));
        for (k, v) in &object {
            if *k != key {
                prop_assert_eq!(&patched[k.as_str()], &Value::from(*v));
            }
        }
    }
}
