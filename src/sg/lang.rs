//! C# language support via ast-grep-language.
//!
//! The built-in `SupportLang::CSharp` bundles the tree-sitter C# grammar, so
//! span acquisition (ast-grep) and validation (tree-sitter) see the same tree.

pub use ast_grep_language::SupportLang;

/// Get the C# language for ast-grep operations.
pub fn csharp() -> SupportLang {
    SupportLang::CSharp
}
