use crate::sg::lang::csharp;
use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::AstGrep;
use ast_grep_language::SupportLang;

/// Declarations that `RemoveBlock` may delete as a unit.
const MEMBER_KINDS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "destructor_declaration",
    "property_declaration",
    "indexer_declaration",
    "event_declaration",
    "event_field_declaration",
    "field_declaration",
    "operator_declaration",
    "conversion_operator_declaration",
    "delegate_declaration",
    "class_declaration",
    "struct_declaration",
    "record_declaration",
    "interface_declaration",
    "enum_declaration",
    "local_function_statement",
];

/// Non-expression parents under which a bare identifier still reads as a value.
const VALUE_CONTEXTS: &[&str] = &[
    "argument",
    "equals_value_clause",
    "expression_statement",
    "return_statement",
    "arrow_expression_clause",
    "if_statement",
    "while_statement",
    "interpolation",
];

/// Byte span of a located syntax node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpan {
    pub kind: String,
    pub byte_start: usize,
    pub byte_end: usize,
    pub text: String,
}

impl NodeSpan {
    pub fn len(&self) -> usize {
        self.byte_end - self.byte_start
    }

    pub fn is_empty(&self) -> bool {
        self.byte_start == self.byte_end
    }
}

/// A `using` directive and the dotted name it imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsingDirective {
    pub span: NodeSpan,
    pub name: String,
}

/// Span acquisition over a C# syntax tree.
///
/// Locates the nodes the source patch operations act on; it never edits.
/// Callers turn spans into [`crate::edit::Edit`]s.
pub struct SyntaxLocator {
    sg: AstGrep<StrDoc<SupportLang>>,
}

impl SyntaxLocator {
    pub fn new(source: &str) -> Self {
        Self {
            sg: AstGrep::new(source, csharp()),
        }
    }

    /// All nodes of the given kind, in document order.
    pub fn find_by_kind(&self, kind: &str) -> Vec<NodeSpan> {
        self.sg
            .root()
            .dfs()
            .filter(|node| node.kind() == kind)
            .map(|node| span_of(node.kind().as_ref(), node.range(), node.text().as_ref()))
            .collect()
    }

    /// Every using directive with its imported name.
    pub fn using_directives(&self) -> Vec<UsingDirective> {
        self.find_by_kind("using_directive")
            .into_iter()
            .map(|span| UsingDirective {
                name: using_name(&span.text),
                span,
            })
            .collect()
    }

    /// Outermost expression nodes whose trimmed text equals `text`.
    pub fn expressions_matching(&self, text: &str) -> Vec<NodeSpan> {
        let wanted = text.trim();
        let mut matches: Vec<NodeSpan> = Vec::new();

        for node in self.sg.root().dfs() {
            let kind = node.kind();
            let parent_kind = node
                .parent()
                .map(|p| p.kind().to_string())
                .unwrap_or_default();
            if !is_expression(kind.as_ref(), &parent_kind) {
                continue;
            }

            let range = node.range();
            // dfs is pre-order, so an enclosing match is always seen first
            if matches.last().is_some_and(|m| range.start < m.byte_end) {
                continue;
            }

            if node.text().trim() == wanted {
                matches.push(span_of(kind.as_ref(), range, node.text().as_ref()));
            }
        }

        matches
    }

    /// Smallest statement block whose text contains `needle`.
    pub fn smallest_block_containing(&self, needle: &str) -> Option<NodeSpan> {
        self.smallest_where(needle, |kind, _| kind == "block")
    }

    /// Smallest member declaration, or standalone nested block, containing `needle`.
    pub fn smallest_member_containing(&self, needle: &str) -> Option<NodeSpan> {
        self.smallest_where(needle, |kind, parent| {
            MEMBER_KINDS.contains(&kind) || (kind == "block" && parent == "block")
        })
    }

    fn smallest_where(
        &self,
        needle: &str,
        accept: impl Fn(&str, &str) -> bool,
    ) -> Option<NodeSpan> {
        self.sg
            .root()
            .dfs()
            .filter(|node| {
                let parent_kind = node
                    .parent()
                    .map(|p| p.kind().to_string())
                    .unwrap_or_default();
                accept(node.kind().as_ref(), &parent_kind) && node.text().contains(needle)
            })
            .map(|node| span_of(node.kind().as_ref(), node.range(), node.text().as_ref()))
            .min_by_key(NodeSpan::len)
    }
}

fn span_of(kind: &str, range: std::ops::Range<usize>, text: &str) -> NodeSpan {
    NodeSpan {
        kind: kind.to_string(),
        byte_start: range.start,
        byte_end: range.end,
        text: text.to_string(),
    }
}

fn is_expression(kind: &str, parent_kind: &str) -> bool {
    if kind.ends_with("_expression") || kind.ends_with("_literal") {
        return true;
    }
    kind == "identifier"
        && (parent_kind.ends_with("_expression") || VALUE_CONTEXTS.contains(&parent_kind))
}

/// Dotted name imported by a using directive, whitespace removed.
///
/// `global using static System.Math;` yields `System.Math`; for an alias
/// (`using Json = Newtonsoft.Json;`) the aliased target is returned.
pub fn using_name(directive: &str) -> String {
    let mut rest = directive.trim().trim_end_matches(';').trim();
    for keyword in ["global", "using", "static", "unsafe"] {
        if let Some(tail) = rest.strip_prefix(keyword) {
            if tail.starts_with(char::is_whitespace) {
                rest = tail.trim_start();
            }
        }
    }

    let target = match rest.split_once('=') {
        Some((_, target)) => target,
        None => rest,
    };
    target.chars().filter(|c| !c.is_whitespace()).collect()
}
