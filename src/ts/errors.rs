use crate::ts::validator::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeSitterError {
    #[error("failed to set language for parser")]
    LanguageSet,

    #[error("failed to parse source code")]
    ParseFailed,

    #[error("syntax error detected at line {line}, column {column}: {context}")]
    SyntaxError {
        line: usize,
        column: usize,
        context: String,
    },

    #[error("patched source has {count} syntax error(s)")]
    PatchedSourceInvalid {
        count: usize,
        errors: Vec<ErrorLocation>,
    },
}
