//! Format-aware patchers.
//!
//! Every patcher implements the same contract: `validate` never mutates,
//! `apply` either previews (dry run) or saves a rollback pre-image and then
//! writes atomically, and `rollback`/`cleanup_rollback` manage pre-images.
//!
//! A patcher only supplies the format-specific pieces ([`Patcher::transform`]
//! and the pre/post checks); the validate → transform → post-validate →
//! write pipeline is shared through the trait's provided methods, so a
//! candidate that fails post-validation is never written.

pub mod csharp;
pub mod errors;
pub mod json;
mod preview;
pub mod registry;
pub mod rollback;
pub mod text;
pub mod unity_asset;

pub use csharp::CSharpPatcher;
pub use errors::PatchError;
pub use json::JsonPatcher;
pub use registry::PatcherSet;
pub use rollback::RollbackStore;
pub use text::TextPatcher;
pub use unity_asset::UnityAssetPatcher;

use crate::config::{CodePatch, PatchType};
use crate::edit::atomic_write;
use std::fs;
use std::io;
use std::path::Path;

/// Result of [`Patcher::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchValidation {
    pub is_valid: bool,
    pub target_found: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl PatchValidation {
    fn invalid(error: String) -> Self {
        Self {
            is_valid: false,
            target_found: false,
            errors: vec![error],
            warnings: Vec::new(),
        }
    }
}

/// Result of [`Patcher::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchOutcome should be checked for success"]
pub struct PatchOutcome {
    pub success: bool,
    pub modified: bool,
    pub message: String,
    /// Present for successful dry runs
    pub preview: Option<String>,
    /// Present when bytes were written
    pub rollback_id: Option<String>,
}

impl PatchOutcome {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            modified: false,
            message,
            preview: None,
            rollback_id: None,
        }
    }

    fn unchanged() -> Self {
        Self {
            success: true,
            modified: false,
            message: "No changes made - target pattern not found or already applied".to_string(),
            preview: None,
            rollback_id: None,
        }
    }
}

pub trait Patcher {
    fn patch_type(&self) -> PatchType;

    fn rollback_store(&self) -> &RollbackStore;

    /// Compute the patched content in memory.
    fn transform(&self, content: &str, patch: &CodePatch) -> Result<String, PatchError>;

    /// Whether the patch has something to act on in `content`.
    fn target_present(&self, content: &str, patch: &CodePatch) -> bool {
        content.contains(patch.search.as_str())
    }

    /// Whether a missing target fails the patch instead of skipping it.
    fn target_required(&self, _patch: &CodePatch) -> bool {
        false
    }

    /// Whether an empty `search` is a schema error for this format.
    fn requires_search(&self) -> bool {
        true
    }

    /// Format errors in the unpatched content that make the patch invalid.
    fn check_source(&self, _content: &str, _patch: &CodePatch) -> Vec<String> {
        Vec::new()
    }

    /// Format errors in the candidate content; any error blocks the write.
    fn check_patched(&self, _original: &str, _patched: &str, _patch: &CodePatch) -> Vec<String> {
        Vec::new()
    }

    /// Validate a patch against already-loaded content.
    fn validate_content(&self, content: &str, patch: &CodePatch) -> PatchValidation {
        let mut errors = Vec::new();
        if patch.search.is_empty() && self.requires_search() {
            errors.push(PatchError::EmptySearch.to_string());
        }
        errors.extend(self.check_source(content, patch));

        let target_found = errors.is_empty() && self.target_present(content, patch);
        let mut warnings = Vec::new();
        if !target_found {
            warnings.push("Target pattern not found in file".to_string());
        }

        PatchValidation {
            is_valid: errors.is_empty(),
            target_found,
            errors,
            warnings,
        }
    }

    /// Check a patch against a file without touching it.
    fn validate(&self, file: &Path, patch: &CodePatch) -> PatchValidation {
        match fs::read_to_string(file) {
            Ok(content) => self.validate_content(&content, patch),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                PatchValidation::invalid(format!("File not found: {}", file.display()))
            }
            Err(e) => PatchValidation::invalid(format!("Failed to read {}: {}", file.display(), e)),
        }
    }

    /// Apply a patch; with `dry_run` nothing is written and a preview is returned.
    fn apply(&self, file: &Path, patch: &CodePatch, dry_run: bool) -> PatchOutcome {
        let original = match fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return PatchOutcome::failed(format!(
                    "Validation failed: File not found: {}",
                    file.display()
                ));
            }
            Err(e) => {
                return PatchOutcome::failed(format!("Failed to read {}: {}", file.display(), e))
            }
        };

        let validation = self.validate_content(&original, patch);
        if !validation.is_valid {
            return PatchOutcome::failed(format!(
                "Validation failed: {}",
                validation.errors.join("; ")
            ));
        }

        let patched = match self.transform(&original, patch) {
            Ok(patched) => patched,
            Err(e) => return PatchOutcome::failed(e.to_string()),
        };

        if patched == original {
            tracing::debug!(file = %file.display(), "patch made no changes");
            return PatchOutcome::unchanged();
        }

        let post_errors = self.check_patched(&original, &patched, patch);
        if !post_errors.is_empty() {
            return PatchOutcome::failed(format!(
                "Post-validation failed: {}",
                post_errors.join("; ")
            ));
        }

        if dry_run {
            return PatchOutcome {
                success: true,
                modified: true,
                message: format!("Dry run - {} would be patched", file.display()),
                preview: Some(preview::render(file, self.patch_type(), &original, &patched)),
                rollback_id: None,
            };
        }

        let rollback_id = match self.rollback_store().save(file) {
            Ok(id) => id,
            Err(e) => {
                return PatchOutcome::failed(format!("Failed to create rollback point: {}", e))
            }
        };

        if let Err(e) = atomic_write(file, patched.as_bytes()) {
            self.rollback_store().cleanup(&rollback_id);
            return PatchOutcome::failed(format!("Failed to write {}: {}", file.display(), e));
        }

        tracing::info!(
            file = %file.display(),
            patch_type = %self.patch_type(),
            "patch applied"
        );
        PatchOutcome {
            success: true,
            modified: true,
            message: format!("Patch applied to {}", file.display()),
            preview: None,
            rollback_id: Some(rollback_id),
        }
    }

    fn rollback(&self, file: &Path, rollback_id: &str) -> bool {
        self.rollback_store().restore(file, rollback_id)
    }

    fn cleanup_rollback(&self, rollback_id: &str) {
        self.rollback_store().cleanup(rollback_id)
    }
}

/// Resolve an operation name case-insensitively against a patcher's vocabulary.
pub(crate) fn parse_operation<T: Copy>(
    operation: &str,
    known: &[(&str, T)],
    patch_type: PatchType,
) -> Result<T, PatchError> {
    let wanted = operation.trim();
    if let Some((_, op)) = known
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
    {
        return Ok(*op);
    }

    let lowered = wanted.to_ascii_lowercase();
    let hint = known
        .iter()
        .map(|(name, _)| {
            let score = strsim::normalized_levenshtein(&name.to_ascii_lowercase(), &lowered);
            (name, score)
        })
        .filter(|(_, score)| *score >= 0.6)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(name, _)| format!(" (did you mean '{}'?)", name))
        .unwrap_or_default();

    Err(PatchError::UnsupportedOperation {
        operation: wanted.to_string(),
        patch_type,
        hint,
    })
}
