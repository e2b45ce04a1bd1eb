//! Tree-sitter integration for C# syntax checking.
//!
//! Source patches are spliced as raw byte spans; this module re-parses the
//! candidate result so a patch that breaks the syntax tree is rejected
//! before anything is written.

pub mod errors;
pub mod parser;
pub mod validator;

pub use errors::TreeSitterError;
pub use parser::{CSharpParser, ParsedSource};
pub use validator::{
    pooled, validate_snippet, validate_syntax, ErrorLocation, ParseValidator, SnippetCategory,
};
