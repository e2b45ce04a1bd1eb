//! ast-grep integration for locating C# syntax nodes.
//!
//! Patch operations never edit through ast-grep; they ask the locator for
//! byte spans and splice those with the `edit` primitive.

pub mod lang;
pub mod locator;

pub use lang::csharp;
pub use locator::{using_name, NodeSpan, SyntaxLocator, UsingDirective};
