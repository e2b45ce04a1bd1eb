//! Parse validation for patched C# sources.
//!
//! # Hard Rule
//!
//! After splicing an edit, re-parse the candidate with tree-sitter. If the
//! candidate has any ERROR or MISSING node, the patch is rejected and the
//! file is never written, even when the original was already broken.

use crate::ts::errors::TreeSitterError;
use crate::ts::parser::{CSharpParser, ParsedSource};

/// Location of an error node in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    pub byte_start: usize,
    pub byte_end: usize,
    pub line: usize,
    pub column: usize,
    pub context: String,
}

impl std::fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}, column {}: near `{}`",
            self.line, self.column, self.context
        )
    }
}

/// Parse validator owning its own parser.
pub struct ParseValidator {
    parser: CSharpParser,
}

impl ParseValidator {
    pub fn new() -> Result<Self, TreeSitterError> {
        Ok(Self {
            parser: CSharpParser::new()?,
        })
    }

    /// Validate that source has no parse errors.
    pub fn validate(&mut self, source: &str) -> Result<(), TreeSitterError> {
        let parsed = self.parser.parse_with_source(source)?;
        first_error(collect_errors(&parsed, source))
    }

    /// Check a patched candidate: every error node is reported.
    pub fn validate_patched(&mut self, patched: &str) -> Result<(), TreeSitterError> {
        let parsed = self.parser.parse_with_source(patched)?;
        all_errors(collect_errors(&parsed, patched))
    }
}

/// Pooled validation functions that reuse the thread-local parser.
pub mod pooled {
    use super::*;
    use crate::pool;

    /// Validate source code using pooled parser.
    pub fn validate(source: &str) -> Result<(), TreeSitterError> {
        pool::with_parser(|parser| {
            let parsed = parser.parse_with_source(source)?;
            first_error(collect_errors(&parsed, source))
        })?
    }

    /// Check a patched candidate using pooled parser.
    pub fn validate_patched(patched: &str) -> Result<(), TreeSitterError> {
        pool::with_parser(|parser| {
            let parsed = parser.parse_with_source(patched)?;
            all_errors(collect_errors(&parsed, patched))
        })?
    }
}

/// Validate that C# source code has no syntax errors.
pub fn validate_syntax(source: &str) -> Result<(), TreeSitterError> {
    pooled::validate(source)
}

/// Category of code snippet for validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetCategory {
    /// A braced statement block
    Block,
    /// One or more statements
    Statement,
    /// An expression
    Expression,
    /// A class member (method, property, field, ...)
    Member,
}

/// Check if a code snippet is valid as a specific syntactic category.
pub fn validate_snippet(snippet: &str, category: SnippetCategory) -> Result<(), TreeSitterError> {
    let wrapped = match category {
        SnippetCategory::Block => format!("class __Wrapper {{ void __Check() {} }}", snippet),
        SnippetCategory::Statement => {
            format!("class __Wrapper {{ void __Check() {{ {} }} }}", snippet)
        }
        SnippetCategory::Expression => {
            format!("class __Wrapper {{ object __Check() {{ return {}; }} }}", snippet)
        }
        SnippetCategory::Member => format!("class __Wrapper {{ {} }}", snippet),
    };

    validate_syntax(&wrapped)
}

fn first_error(errors: Vec<ErrorLocation>) -> Result<(), TreeSitterError> {
    match errors.into_iter().next() {
        None => Ok(()),
        Some(e) => Err(TreeSitterError::SyntaxError {
            line: e.line,
            column: e.column,
            context: e.context,
        }),
    }
}

fn all_errors(errors: Vec<ErrorLocation>) -> Result<(), TreeSitterError> {
    if errors.is_empty() {
        return Ok(());
    }
    Err(TreeSitterError::PatchedSourceInvalid {
        count: errors.len(),
        errors,
    })
}

/// Collect all error nodes from a parsed source.
fn collect_errors(parsed: &ParsedSource<'_>, source: &str) -> Vec<ErrorLocation> {
    let mut errors = Vec::new();
    if parsed.has_errors() {
        collect_errors_recursive(parsed.root_node(), source, &mut errors);
    }
    errors
}

fn collect_errors_recursive(
    node: tree_sitter::Node<'_>,
    source: &str,
    errors: &mut Vec<ErrorLocation>,
) {
    if node.is_error() || node.is_missing() {
        let start = node.start_position();
        let byte_start = node.start_byte();
        let byte_end = node.end_byte();

        // Up to 20 bytes either side of the error
        let context_start = floor_char_boundary(source, byte_start.saturating_sub(20));
        let context_end = floor_char_boundary(source, (byte_end + 20).min(source.len()));
        let context = source
            .get(context_start..context_end)
            .unwrap_or("")
            .replace('\n', "\\n");

        errors.push(ErrorLocation {
            byte_start,
            byte_end,
            line: start.row + 1,
            column: start.column + 1,
            context,
        });
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_errors_recursive(child, source, errors);
    }
}

fn floor_char_boundary(source: &str, mut index: usize) -> usize {
    while index > 0 && !source.is_char_boundary(index) {
        index -= 1;
    }
    index
}
