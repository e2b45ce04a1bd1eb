use crate::config::PatchType;
use similar::TextDiff;
use std::path::Path;

/// Human-readable summary of a would-be patch, with a unified diff.
pub(crate) fn render(file: &Path, patch_type: PatchType, original: &str, patched: &str) -> String {
    let byte_delta = patched.len() as i64 - original.len() as i64;
    let line_delta = patched.lines().count() as i64 - original.lines().count() as i64;

    let mut preview = vec![
        "=== Patch Preview ===".to_string(),
        format!("File: {}", file.display()),
        format!("Type: {}", patch_type),
        format!("Original length: {} bytes", original.len()),
        format!("Patched length: {} bytes", patched.len()),
        format!("Difference: {:+} bytes", byte_delta),
        format!("Line change: {:+}", line_delta),
        String::new(),
    ]
    .join("\n");

    let diff = TextDiff::from_lines(original, patched);
    preview.push_str(
        &diff
            .unified_diff()
            .context_radius(2)
            .header("original", "patched")
            .to_string(),
    );
    preview
}
