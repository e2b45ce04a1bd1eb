use crate::config::{CodePatch, PatchType};
use crate::patcher::text::substitute_literal;
use crate::patcher::{parse_operation, PatchError, Patcher, RollbackStore};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonOp {
    AddProperty,
    RemoveProperty,
    ReplaceValue,
}

const OPERATIONS: &[(&str, JsonOp)] = &[
    ("AddProperty", JsonOp::AddProperty),
    ("RemoveProperty", JsonOp::RemoveProperty),
    ("ReplaceValue", JsonOp::ReplaceValue),
];

/// JSON patcher. `search` is a dotted path (`a.b[0].c` or `a.b.0.c`); the
/// empty path addresses the document root.
pub struct JsonPatcher {
    rollback: RollbackStore,
}

impl JsonPatcher {
    pub fn new(rollback: RollbackStore) -> Self {
        Self { rollback }
    }
}

impl Patcher for JsonPatcher {
    fn patch_type(&self) -> PatchType {
        PatchType::Json
    }

    fn rollback_store(&self) -> &RollbackStore {
        &self.rollback
    }

    fn requires_search(&self) -> bool {
        false
    }

    fn check_source(&self, content: &str, patch: &CodePatch) -> Vec<String> {
        let Some(operation) = patch.operation.as_deref() else {
            if patch.search.is_empty() {
                return vec![PatchError::EmptySearch.to_string()];
            }
            return Vec::new();
        };

        let mut errors = Vec::new();
        if let Err(e) = parse_operation(operation, OPERATIONS, PatchType::Json) {
            errors.push(e.to_string());
        }
        if let Err(e) = serde_json::from_str::<Value>(content) {
            errors.push(PatchError::InvalidJson(e).to_string());
        }
        errors
    }

    fn target_present(&self, content: &str, patch: &CodePatch) -> bool {
        let Some(operation) = patch.operation.as_deref() else {
            return content.contains(patch.search.as_str());
        };
        let (Ok(op), Ok(mut doc)) = (
            parse_operation(operation, OPERATIONS, PatchType::Json),
            serde_json::from_str::<Value>(content),
        ) else {
            return false;
        };

        let segments = path_segments(&patch.search);
        match (op, navigate_mut(&mut doc, &segments, &patch.search)) {
            (JsonOp::AddProperty, Ok(target)) => target.is_object(),
            (JsonOp::RemoveProperty, Ok(_)) => !segments.is_empty(),
            (JsonOp::ReplaceValue, Ok(_)) => true,
            (_, Err(_)) => false,
        }
    }

    fn transform(&self, content: &str, patch: &CodePatch) -> Result<String, PatchError> {
        let Some(operation) = patch.operation.as_deref() else {
            return substitute_literal(content, &patch.search, &patch.replace, patch.mode);
        };
        let op = parse_operation(operation, OPERATIONS, PatchType::Json)?;

        let mut doc: Value = serde_json::from_str(content)?;
        let segments = path_segments(&patch.search);
        match op {
            JsonOp::AddProperty => {
                add_property(&mut doc, &segments, &patch.search, &patch.replace)?
            }
            JsonOp::RemoveProperty => remove_property(&mut doc, &segments, &patch.search)?,
            JsonOp::ReplaceValue => {
                *navigate_mut(&mut doc, &segments, &patch.search)? = parse_value(&patch.replace)
            }
        }

        write_like(content, &doc)
    }

    fn check_patched(&self, _original: &str, patched: &str, _patch: &CodePatch) -> Vec<String> {
        match serde_json::from_str::<Value>(patched) {
            Ok(_) => Vec::new(),
            Err(e) => vec![PatchError::InvalidJson(e).to_string()],
        }
    }
}

/// Split a dotted path; bracketed indices become their own segments.
fn path_segments(path: &str) -> Vec<String> {
    path.replace('[', ".")
        .replace(']', "")
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn navigate_mut<'a>(
    root: &'a mut Value,
    segments: &[String],
    path: &str,
) -> Result<&'a mut Value, PatchError> {
    let mut current = root;
    for segment in segments {
        let next = match current {
            Value::Object(map) => map.get_mut(segment.as_str()),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        };
        current = next.ok_or_else(|| PatchError::PathNotFound {
            path: path.to_string(),
        })?;
    }
    Ok(current)
}

fn add_property(
    doc: &mut Value,
    segments: &[String],
    path: &str,
    replace: &str,
) -> Result<(), PatchError> {
    let Value::Object(target) = navigate_mut(doc, segments, path)? else {
        return Err(PatchError::NotAnObject {
            path: path.to_string(),
        });
    };

    for (key, value) in parse_properties(replace)? {
        target.insert(key, value);
    }
    Ok(())
}

/// `{...}` merges every key; otherwise `key:value` split at the first colon.
fn parse_properties(replace: &str) -> Result<Map<String, Value>, PatchError> {
    let trimmed = replace.trim();
    if trimmed.starts_with('{') {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
            return Ok(map);
        }
    }

    let invalid = || PatchError::InvalidProperty {
        value: replace.to_string(),
    };
    let (key, value) = trimmed.split_once(':').ok_or_else(invalid)?;
    let key = key.trim().trim_matches('"');
    if key.is_empty() {
        return Err(invalid());
    }

    let mut map = Map::new();
    map.insert(key.to_string(), parse_value(value.trim()));
    Ok(map)
}

fn remove_property(doc: &mut Value, segments: &[String], path: &str) -> Result<(), PatchError> {
    let not_found = || PatchError::PathNotFound {
        path: path.to_string(),
    };
    let (last, parent_segments) = segments.split_last().ok_or_else(not_found)?;

    let removed = match navigate_mut(doc, parent_segments, path)? {
        Value::Object(map) => map.shift_remove(last.as_str()).is_some(),
        Value::Array(items) => match last.parse::<usize>() {
            Ok(i) if i < items.len() => {
                items.remove(i);
                true
            }
            _ => false,
        },
        _ => false,
    };

    if removed {
        Ok(())
    } else {
        Err(not_found())
    }
}

/// JSON literal when it parses, otherwise a plain string.
fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Serialise `doc` in the layout of `original`: compact when the original has
/// no line breaks, otherwise pretty-printed with its indent unit.
fn write_like(original: &str, doc: &Value) -> Result<String, PatchError> {
    if !original.trim_end().contains('\n') {
        let mut out = serde_json::to_string(doc)?;
        if original.ends_with('\n') {
            out.push('\n');
        }
        return Ok(out);
    }

    let indent = detect_indent(original);
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut serializer)?;

    let mut out = String::from_utf8_lossy(&buf).into_owned();
    if original.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

fn detect_indent(content: &str) -> String {
    content
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect::<String>()
        })
        .find(|indent| !indent.is_empty())
        .unwrap_or_else(|| "  ".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatchMode;

    fn patcher() -> JsonPatcher {
        JsonPatcher::new(RollbackStore::in_temp_dir())
    }

    fn op(search: &str, operation: &str, replace: &str) -> CodePatch {
        CodePatch::new("package.json", PatchType::Json, search)
            .with_operation(operation)
            .with_replace(replace)
    }

    #[test]
    fn add_property_at_root_keeps_compact_layout() {
        let content = r#"{"name":"test","version":"1.0.0"}"#;
        let patched = patcher()
            .transform(content, &op("", "AddProperty", "description:A test package"))
            .unwrap();
        assert_eq!(
            patched,
            r#"{"name":"test","version":"1.0.0","description":"A test package"}"#
        );
    }

    #[test]
    fn add_property_merges_object_literal() {
        let content = "{\n    \"dependencies\": {\n        \"a\": \"1.0\"\n    }\n}\n";
        let patched = patcher()
            .transform(
                content,
                &op("dependencies", "AddProperty", r#"{"b": "2.0", "a": "1.1"}"#),
            )
            .unwrap();
        assert_eq!(
            patched,
            "{\n    \"dependencies\": {\n        \"a\": \"1.1\",\n        \"b\": \"2.0\"\n    }\n}\n"
        );
    }

    #[test]
    fn add_property_parses_typed_values() {
        let content = r#"{"a":{}}"#;
        let patched = patcher()
            .transform(content, &op("a", "addproperty", "\"enabled\": true"))
            .unwrap();
        assert_eq!(patched, r#"{"a":{"enabled":true}}"#);
    }

    #[test]
    fn remove_property_and_array_element() {
        let content = r#"{"keep":1,"drop":2,"list":[1,2,3]}"#;
        let patched = patcher()
            .transform(content, &op("drop", "RemoveProperty", ""))
            .unwrap();
        assert_eq!(patched, r#"{"keep":1,"list":[1,2,3]}"#);

        let patched = patcher()
            .transform(&patched, &op("list[1]", "RemoveProperty", ""))
            .unwrap();
        assert_eq!(patched, r#"{"keep":1,"list":[1,3]}"#);
    }

    #[test]
    fn replace_value_leaves_siblings() {
        let content = "{\n  \"a\": {\n    \"b\": 1,\n    \"c\": [true]\n  }\n}";
        let patched = patcher()
            .transform(content, &op("a.b", "ReplaceValue", r#"{"nested": [1, 2]}"#))
            .unwrap();
        let doc: Value = serde_json::from_str(&patched).unwrap();
        assert_eq!(doc["a"]["b"]["nested"], serde_json::json!([1, 2]));
        assert_eq!(doc["a"]["c"], serde_json::json!([true]));
        assert!(patched.starts_with("{\n  \"a\""));
    }

    #[test]
    fn missing_path_is_an_error() {
        let err = patcher()
            .transform(r#"{"a":1}"#, &op("x.y", "ReplaceValue", "2"))
            .unwrap_err();
        assert!(matches!(err, PatchError::PathNotFound { .. }));

        let validation = patcher().validate_content(r#"{"a":1}"#, &op("x.y", "ReplaceValue", "2"));
        assert!(validation.is_valid);
        assert!(!validation.target_found);
    }

    #[test]
    fn add_property_requires_object() {
        let err = patcher()
            .transform(r#"{"a":1}"#, &op("a", "AddProperty", "k:v"))
            .unwrap_err();
        assert!(matches!(err, PatchError::NotAnObject { .. }));
    }

    #[test]
    fn unknown_operation_and_invalid_json_fail_validation() {
        let validation = patcher().validate_content("{", &op("a", "AddPropery", "k:v"));
        assert!(!validation.is_valid);
        assert_eq!(validation.errors.len(), 2);
        assert!(validation.errors[0].contains("did you mean 'AddProperty'"));
        assert!(validation.errors[1].starts_with("Invalid JSON"));
    }

    #[test]
    fn literal_fallback_is_post_validated() {
        let patch = CodePatch::new("a.json", PatchType::Json, "\"b\"")
            .with_mode(PatchMode::Replace)
            .with_replace("b");
        let patcher = patcher();
        let patched = patcher.transform(r#"{"b":1}"#, &patch).unwrap();
        assert!(!patcher.check_patched(r#"{"b":1}"#, &patched, &patch).is_empty());
    }

    #[test]
    fn path_segments_accept_brackets() {
        assert_eq!(path_segments("a.b[0].c"), vec!["a", "b", "0", "c"]);
        assert_eq!(path_segments("a.b.0.c"), vec!["a", "b", "0", "c"]);
        assert!(path_segments("").is_empty());
    }

    #[test]
    fn detects_tab_indent() {
        assert_eq!(detect_indent("{\n\t\"a\": 1\n}"), "\t");
        assert_eq!(detect_indent("{\n}"), "  ");
    }
}
