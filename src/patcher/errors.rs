use crate::config::PatchType;
use crate::edit::EditError;
use crate::ts::TreeSitterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Search pattern is empty")]
    EmptySearch,

    #[error("Unsupported operation '{operation}' for {patch_type} patches{hint}")]
    UnsupportedOperation {
        operation: String,
        patch_type: PatchType,
        hint: String,
    },

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("JSON path '{path}' not found")]
    PathNotFound { path: String },

    #[error("JSON path '{path}' does not address an object")]
    NotAnObject { path: String },

    #[error("Property must be 'key:value' or an object literal, got '{value}'")]
    InvalidProperty { value: String },

    #[error("Location marker '{marker}' not found in Unity asset")]
    MarkerNotFound { marker: String },

    #[error("Replacement is not a valid {category}: {source}")]
    InvalidReplacement {
        category: &'static str,
        #[source]
        source: TreeSitterError,
    },

    #[error("Edit error: {0}")]
    Edit(#[from] EditError),

    #[error("No patcher registered for {0} patches")]
    NoPatcher(PatchType),
}
