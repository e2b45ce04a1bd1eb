use crate::config::{CodePatch, PatchType};
use crate::patcher::text::substitute_literal;
use crate::patcher::{parse_operation, PatchError, Patcher, RollbackStore};
use crate::pattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetOp {
    ModifyProperty,
    AddComponent,
    RemoveComponent,
}

const OPERATIONS: &[(&str, AssetOp)] = &[
    ("ModifyProperty", AssetOp::ModifyProperty),
    ("AddComponent", AssetOp::AddComponent),
    ("RemoveComponent", AssetOp::RemoveComponent),
];

/// Line-oriented patcher for Unity serialized assets (`.asset`, `.prefab`,
/// `.unity`, ...). Unity's custom tags are not plain YAML, so content is
/// handled as text with a header/structure check before and after the edit.
pub struct UnityAssetPatcher {
    rollback: RollbackStore,
}

impl UnityAssetPatcher {
    pub fn new(rollback: RollbackStore) -> Self {
        Self { rollback }
    }
}

impl Patcher for UnityAssetPatcher {
    fn patch_type(&self) -> PatchType {
        PatchType::UnityAsset
    }

    fn rollback_store(&self) -> &RollbackStore {
        &self.rollback
    }

    fn check_source(&self, content: &str, patch: &CodePatch) -> Vec<String> {
        let mut errors = structure_errors(content);
        if let Some(op) = patch.operation.as_deref() {
            if let Err(e) = parse_operation(op, OPERATIONS, PatchType::UnityAsset) {
                errors.push(e.to_string());
            }
        }
        errors
    }

    fn target_present(&self, content: &str, patch: &CodePatch) -> bool {
        let Some(op) = patch.operation.as_deref() else {
            return content.contains(patch.search.as_str());
        };
        match parse_operation(op, OPERATIONS, PatchType::UnityAsset) {
            Ok(AssetOp::ModifyProperty) => extract_property_value(content, &patch.search).is_some(),
            Ok(AssetOp::AddComponent) => marker_line_end(content, &patch.search).is_some(),
            Ok(AssetOp::RemoveComponent) => content.contains(patch.search.as_str()),
            Err(_) => false,
        }
    }

    /// A component insert with no marker line has nowhere to go.
    fn target_required(&self, patch: &CodePatch) -> bool {
        patch.operation.as_deref().is_some_and(|op| {
            matches!(
                parse_operation(op, OPERATIONS, PatchType::UnityAsset),
                Ok(AssetOp::AddComponent)
            )
        })
    }

    fn transform(&self, content: &str, patch: &CodePatch) -> Result<String, PatchError> {
        let Some(op) = patch.operation.as_deref() else {
            return substitute_literal(content, &patch.search, &patch.replace, patch.mode);
        };

        match parse_operation(op, OPERATIONS, PatchType::UnityAsset)? {
            AssetOp::ModifyProperty => modify_property(content, &patch.search, &patch.replace),
            AssetOp::AddComponent => add_component(content, &patch.search, &patch.replace),
            AssetOp::RemoveComponent => Ok(remove_component(content, &patch.search)),
        }
    }

    fn check_patched(&self, _original: &str, patched: &str, _patch: &CodePatch) -> Vec<String> {
        structure_errors(patched)
    }
}

/// Header and separator checks every serialized Unity asset must pass.
pub fn structure_errors(content: &str) -> Vec<String> {
    let content = content.trim_start_matches('\u{feff}');
    let mut errors = Vec::new();
    if !content.starts_with("%YAML") {
        errors.push("Unity asset must start with %YAML header".to_string());
    }
    if !content.contains("%TAG !u! tag:unity3d.com") {
        errors.push("Unity asset must contain %TAG declaration".to_string());
    }
    if !content.lines().any(|line| line.starts_with("---")) {
        errors.push("Unity asset must contain document separator (---)".to_string());
    }
    errors
}

fn property_regex(key: &str) -> Result<regex::Regex, PatchError> {
    let pattern_text = format!(r"^([ \t]*){}:[^\r\n]*", regex::escape(key.trim()));
    pattern::get_or_compile(&pattern_text).map_err(|source| PatchError::InvalidRegex {
        pattern: pattern_text,
        source,
    })
}

/// Rewrite every `key: value` line, keeping its indentation.
fn modify_property(content: &str, key: &str, value: &str) -> Result<String, PatchError> {
    if key.trim().is_empty() {
        return Err(PatchError::EmptySearch);
    }
    let re = property_regex(key)?;
    let replacement = format!("${{1}}{}: {}", key.trim(), value.replace('$', "$$"));
    Ok(re.replace_all(content, replacement.as_str()).into_owned())
}

/// Byte offset just past the first line containing `marker`.
fn marker_line_end(content: &str, marker: &str) -> Option<usize> {
    if marker.is_empty() {
        return None;
    }
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if line.contains(marker) {
            return Some(offset + line.len());
        }
        offset += line.len();
    }
    None
}

fn add_component(content: &str, marker: &str, component: &str) -> Result<String, PatchError> {
    let at = marker_line_end(content, marker).ok_or_else(|| PatchError::MarkerNotFound {
        marker: marker.to_string(),
    })?;

    let mut out = String::with_capacity(content.len() + component.len() + 2);
    out.push_str(&content[..at]);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(component);
    if !component.ends_with('\n') && at < content.len() {
        out.push('\n');
    }
    out.push_str(&content[at..]);
    Ok(out)
}

/// Delete the whole lines spanned by the first exact occurrence of `block`.
fn remove_component(content: &str, block: &str) -> String {
    let Some(start) = content.find(block).filter(|_| !block.is_empty()) else {
        return content.to_string();
    };
    let end = start + block.len();

    let line_start = content[..start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = if block.ends_with('\n') {
        end
    } else {
        content[end..].find('\n').map_or(content.len(), |i| end + i + 1)
    };

    let mut out = String::with_capacity(content.len());
    out.push_str(&content[..line_start]);
    out.push_str(&content[line_end..]);
    out
}

/// Current value of the first `key:` line, trimmed.
pub fn extract_property_value(content: &str, key: &str) -> Option<String> {
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    content.lines().find_map(|line| {
        line.trim_start()
            .strip_prefix(key)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(|value| value.trim().to_string())
    })
}

/// Whether the asset holds an object of the given class id (`--- !u!<type>`)
/// or a MonoBehaviour whose script guid is `<type>`.
pub fn has_component(content: &str, component_type: &str) -> bool {
    let component_type = component_type.trim();
    if component_type.is_empty() {
        return false;
    }

    let marker = format!("--- !u!{}", component_type);
    let script_guid = format!("guid: {}", component_type);
    content.lines().any(|line| {
        let header_match = line
            .strip_prefix(&marker)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '));
        let script_match = line.trim_start().starts_with("m_Script:")
            && line.contains("fileID: 11500000")
            && line.contains(&script_guid);
        header_match || script_match
    })
}
