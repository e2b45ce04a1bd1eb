//! Syntax-aware C# patcher.
//!
//! Spans come from an ast-grep walk of the tree, edits are spliced in memory
//! with [`crate::edit::apply_edits`], and the candidate is re-parsed with
//! tree-sitter before anything is written. Bytes outside the edited spans
//! (comments included) are never touched.

use crate::config::{CodePatch, PatchType};
use crate::edit::{apply_edits, Edit};
use crate::patcher::text::substitute_literal;
use crate::patcher::{parse_operation, PatchError, Patcher, RollbackStore};
use crate::sg::locator::{using_name, NodeSpan, SyntaxLocator};
use crate::ts::{pooled, validate_snippet, SnippetCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceOp {
    RemoveUsing,
    ReplaceExpression,
    ReplaceBlock,
    RemoveBlock,
}

const OPERATIONS: &[(&str, SourceOp)] = &[
    ("RemoveUsing", SourceOp::RemoveUsing),
    ("RemoveImport", SourceOp::RemoveUsing),
    ("ReplaceExpression", SourceOp::ReplaceExpression),
    ("ReplaceBlock", SourceOp::ReplaceBlock),
    ("RemoveBlock", SourceOp::RemoveBlock),
];

pub struct CSharpPatcher {
    rollback: RollbackStore,
}

impl CSharpPatcher {
    pub fn new(rollback: RollbackStore) -> Self {
        Self { rollback }
    }
}

impl Patcher for CSharpPatcher {
    fn patch_type(&self) -> PatchType {
        PatchType::CSharp
    }

    fn rollback_store(&self) -> &RollbackStore {
        &self.rollback
    }

    fn check_source(&self, _content: &str, patch: &CodePatch) -> Vec<String> {
        match patch.operation.as_deref() {
            Some(op) => match parse_operation(op, OPERATIONS, PatchType::CSharp) {
                Ok(_) => Vec::new(),
                Err(e) => vec![e.to_string()],
            },
            None => Vec::new(),
        }
    }

    fn target_present(&self, content: &str, patch: &CodePatch) -> bool {
        let Some(op) = patch.operation.as_deref() else {
            return content.contains(patch.search.as_str());
        };
        let Ok(op) = parse_operation(op, OPERATIONS, PatchType::CSharp) else {
            return false;
        };

        let locator = SyntaxLocator::new(content);
        match op {
            SourceOp::RemoveUsing => !matching_usings(&locator, &patch.search).is_empty(),
            SourceOp::ReplaceExpression => {
                !locator.expressions_matching(&patch.search).is_empty()
            }
            SourceOp::ReplaceBlock => locator.smallest_block_containing(&patch.search).is_some(),
            SourceOp::RemoveBlock => locator.smallest_member_containing(&patch.search).is_some(),
        }
    }

    fn transform(&self, content: &str, patch: &CodePatch) -> Result<String, PatchError> {
        let Some(op) = patch.operation.as_deref() else {
            return substitute_literal(content, &patch.search, &patch.replace, patch.mode);
        };
        let op = parse_operation(op, OPERATIONS, PatchType::CSharp)?;
        let locator = SyntaxLocator::new(content);

        let edits = match op {
            SourceOp::RemoveUsing => matching_usings(&locator, &patch.search)
                .iter()
                .map(|span| line_removal(content, span))
                .collect(),
            SourceOp::ReplaceExpression => locator
                .expressions_matching(&patch.search)
                .into_iter()
                .map(|span| Edit::new(span.byte_start, span.byte_end, &patch.replace, &span.text))
                .collect(),
            SourceOp::ReplaceBlock => match locator.smallest_block_containing(&patch.search) {
                Some(span) => {
                    let block = replacement_block(&patch.replace)?;
                    vec![Edit::new(span.byte_start, span.byte_end, block, &span.text)]
                }
                None => Vec::new(),
            },
            SourceOp::RemoveBlock => locator
                .smallest_member_containing(&patch.search)
                .map(|span| line_removal(content, &span))
                .into_iter()
                .collect(),
        };

        Ok(apply_edits(content, edits)?)
    }

    fn check_patched(&self, _original: &str, patched: &str, _patch: &CodePatch) -> Vec<String> {
        match pooled::validate_patched(patched) {
            Ok(()) => Vec::new(),
            Err(e) => vec![e.to_string()],
        }
    }
}

fn matching_usings(locator: &SyntaxLocator, search: &str) -> Vec<NodeSpan> {
    let wanted = using_name(search);
    locator
        .using_directives()
        .into_iter()
        .filter(|directive| directive.name == wanted)
        .map(|directive| directive.span)
        .collect()
}

/// Braces are added when missing; the result must parse as a block.
fn replacement_block(replace: &str) -> Result<String, PatchError> {
    let trimmed = replace.trim();
    let block = if trimmed.starts_with('{') {
        trimmed.to_string()
    } else {
        format!("{{\n{}\n}}", trimmed)
    };
    validate_snippet(&block, SnippetCategory::Block).map_err(|source| {
        PatchError::InvalidReplacement {
            category: "block",
            source,
        }
    })?;
    Ok(block)
}

fn line_removal(content: &str, span: &NodeSpan) -> Edit {
    let (start, end) = full_line_span(content, span.byte_start, span.byte_end);
    Edit::removal(start, end, &content[start..end])
}

/// Widen a span to whole lines when nothing but whitespace shares them.
fn full_line_span(content: &str, start: usize, end: usize) -> (usize, usize) {
    let line_start = content[..start].rfind('\n').map_or(0, |i| i + 1);
    if !content[line_start..start].trim().is_empty() {
        return (start, end);
    }

    let rest = &content[end..];
    let line_end = match rest.find('\n') {
        Some(i) if rest[..i].trim().is_empty() => end + i + 1,
        None if rest.trim().is_empty() => content.len(),
        _ => return (start, end),
    };
    (line_start, line_end)
}
