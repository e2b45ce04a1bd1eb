//! Build Prep: deterministic preparation of a game-client project tree
//! before a build.
//!
//! A declarative [`PreparationConfig`] names packages and assemblies to copy
//! out of a content cache, asset files to copy, move or delete, and code
//! patches to apply to C#, JSON, Unity asset and plain-text files.
//!
//! # Architecture
//!
//! - [`patcher`]: one [`Patcher`] per content format behind a shared
//!   validate / apply / rollback contract, registered in a [`PatcherSet`].
//!   C# edits compile down to verified byte-span [`Edit`]s located with
//!   ast-grep and re-parsed with tree-sitter before anything is written.
//! - [`cache`]: the [`ContentCache`] of packages and assemblies.
//! - [`validation`]: four cumulative [`ValidationLevel`]s producing coded
//!   findings.
//! - [`prepare`]: the [`Preparer`] that runs the fixed step order behind a
//!   zip backup and rolls back on failure.
//! - [`sources`], [`manifest`] and [`batch`]: collecting sources into the
//!   cache and mapping them onto project targets, one at a time or in bulk.
//!
//! # Safety
//!
//! - Patch results are validated before they are written
//! - Atomic file writes (tempfile + fsync + rename)
//! - Dry runs never touch the filesystem
//! - A failed run restores every path it was about to change
//!
//! # Example
//!
//! ```no_run
//! use build_prep::{load_from_path, EventLog, PatcherSet, PrepareOptions, Preparer};
//!
//! let config = load_from_path("build/preparation/configs/default.json")?;
//! let preparer = Preparer::new(".", PatcherSet::default());
//! let mut events = EventLog::new();
//! let summary = preparer.run(&config, PrepareOptions::default(), &mut events)?;
//! println!("{} copied, {} patched", summary.copied, summary.patched);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod batch;
pub mod cache;
pub mod config;
pub mod edit;
pub mod events;
pub mod fsops;
pub mod logging;
pub mod manifest;
pub mod patcher;
pub mod pattern;
pub mod pool;
pub mod prepare;
pub mod sg;
pub mod sources;
pub mod ts;
pub mod validation;

// Re-exports
pub use batch::{BatchOptions, BatchProcessor, BatchResult, FailedItem};
pub use cache::{CacheError, CacheItem, CacheItemType, ContentCache};
pub use config::{
    load_from_path, load_from_str, save_to_path, CodePatch, ConfigError, PatchMode, PatchType,
    PreparationConfig,
};
pub use edit::{Edit, EditError};
pub use events::{EventLog, EventSink, PrepEvent, Step, TracingSink};
pub use manifest::{BatchManifest, ItemType, ManifestError, PreparationManifest};
pub use patcher::{PatchError, PatchOutcome, PatchValidation, Patcher, PatcherSet, RollbackStore};
pub use prepare::{BackupError, PrepareError, PrepareOptions, PrepareSummary, Preparer};
pub use sources::{add_injection, SourceAddition, SourceError, SourceManager};
pub use ts::TreeSitterError;
pub use validation::{ValidationIssue, ValidationLevel, ValidationResult, Validator};
