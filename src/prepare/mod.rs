//! Preparation orchestrator.
//!
//! A run validates the config, snapshots every path it is about to touch,
//! then executes the fixed step order (packages, assemblies, asset
//! manipulations, code patches, define symbols). Any failure restores the
//! snapshot and returns the original error; success deletes it. Dry runs walk
//! the same steps without touching the filesystem.

pub mod backup;

pub use backup::{Backup, BackupError, DEFAULT_BACKUP_DIR};

use crate::cache::resolve_cache_source;
use crate::config::{AssetManipulation, AssetOperation, CodePatch, PreparationConfig};
use crate::events::{emit, EventSink, PrepEvent, Step};
use crate::fsops;
use crate::patcher::{PatchError, PatcherSet};
use crate::validation::{ValidationLevel, ValidationResult, Validator};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepareError {
    #[error("Configuration validation failed with {} error(s)", .0.errors.len())]
    Invalid(ValidationResult),

    #[error("{kind} source not found: {}", path.display())]
    SourceNotFound { kind: &'static str, path: PathBuf },

    #[error("{operation} of {target} requires a source")]
    MissingSource {
        operation: AssetOperation,
        target: String,
    },

    #[error("Target already exists and overwrite is disabled: {}", .0.display())]
    TargetExists(PathBuf),

    #[error("Patch target file not found: {}", .0.display())]
    PatchTargetMissing(PathBuf),

    #[error("Patch target pattern not found in {}", .0.display())]
    PatchTargetNotFound(PathBuf),

    #[error("Patch failed for {}: {message}", file.display())]
    PatchFailed { file: PathBuf, message: String },

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Backup(#[from] BackupError),
}

impl PrepareError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        PrepareError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareOptions {
    pub dry_run: bool,
    /// Run `Full` validation first and refuse to execute on any error
    pub validate: bool,
    /// Fail, rather than skip, patches whose target pattern is absent
    pub strict_patches: bool,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            validate: true,
            strict_patches: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPreview {
    pub file: PathBuf,
    pub preview: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepareSummary {
    pub copied: usize,
    pub moved: usize,
    pub deleted: usize,
    pub patched: usize,
    pub skipped: usize,
    /// Paths written or removed, or that would be on a dry run
    pub touched: Vec<PathBuf>,
    pub duration: Duration,
    pub dry_run: bool,
    /// Archive kept after a successful run; `None` once cleaned up
    pub backup: Option<PathBuf>,
    /// Patch previews collected on dry runs
    pub previews: Vec<PatchPreview>,
}

/// Summary of [`Preparer::restore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    pub archive: PathBuf,
    pub restored: usize,
}

pub struct Preparer {
    project_root: PathBuf,
    patchers: PatcherSet,
    validator: Validator,
    backup_dir: PathBuf,
}

impl Preparer {
    pub fn new(project_root: impl Into<PathBuf>, patchers: PatcherSet) -> Self {
        let project_root = project_root.into();
        Self {
            validator: Validator::new(&project_root),
            backup_dir: project_root.join(DEFAULT_BACKUP_DIR),
            project_root,
            patchers,
        }
    }

    /// Resolved against the project root when relative.
    pub fn with_backup_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.backup_dir = self.project_root.join(dir.as_ref());
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn run(
        &self,
        config: &PreparationConfig,
        options: PrepareOptions,
        sink: &mut dyn EventSink,
    ) -> Result<PrepareSummary, PrepareError> {
        let started = Instant::now();

        if options.validate {
            emit(sink, PrepEvent::ValidationStarted { level: ValidationLevel::Full });
            let result = self.validator.validate(config, ValidationLevel::Full);
            emit(
                sink,
                PrepEvent::ValidationFinished {
                    is_valid: result.is_valid,
                    errors: result.errors.len(),
                    warnings: result.warnings.len(),
                },
            );
            if !result.is_valid {
                let err = PrepareError::Invalid(result);
                emit(sink, PrepEvent::Failed { error: err.to_string() });
                return Err(err);
            }
        }

        let mut run = Run {
            preparer: self,
            options,
            summary: PrepareSummary {
                dry_run: options.dry_run,
                ..Default::default()
            },
            created: Vec::new(),
        };

        if options.dry_run {
            tracing::info!("dry run: no files will be modified");
            if let Err(e) = run.execute(config, sink) {
                emit(sink, PrepEvent::Failed { error: e.to_string() });
                return Err(e);
            }
            return Ok(run.finish(started, sink));
        }

        let targets = self.mutated_paths(config);
        let snapshot = match backup::create(&self.project_root, &self.backup_dir, &targets) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let err = PrepareError::from(e);
                emit(sink, PrepEvent::Failed { error: err.to_string() });
                return Err(err);
            }
        };
        emit(
            sink,
            PrepEvent::BackupCreated {
                path: snapshot.path.clone(),
                entries: snapshot.files,
            },
        );

        if let Err(e) = run.execute(config, sink) {
            tracing::error!("preparation failed, rolling back: {}", e);
            self.roll_back(&snapshot, &run.created, sink);
            emit(sink, PrepEvent::Failed { error: e.to_string() });
            return Err(e);
        }

        match fsops::remove_path(&snapshot.path) {
            Ok(()) => tracing::debug!(path = %snapshot.path.display(), "backup removed"),
            Err(e) => {
                tracing::warn!(path = %snapshot.path.display(), "failed to remove backup: {}", e);
                run.summary.backup = Some(snapshot.path.clone());
            }
        }
        Ok(run.finish(started, sink))
    }

    /// Restore a backup archive over the project: the given archive (or
    /// directory containing `backup.zip`), else the newest backup.
    pub fn restore(&self, backup: Option<&Path>) -> Result<RestoreSummary, PrepareError> {
        let archive = backup::locate(backup, &self.backup_dir)?;
        tracing::info!(archive = %archive.display(), "restoring backup");
        let restored = backup::restore_archive(&archive, &self.project_root)?;
        tracing::info!(restored, "backup restored");
        Ok(RestoreSummary { archive, restored })
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.project_root.join(path)
    }

    /// Every path a real run may write or remove, deduplicated, in step order.
    fn mutated_paths(&self, config: &PreparationConfig) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();
        let mut push = |path: PathBuf| {
            if !paths.contains(&path) {
                paths.push(path);
            }
        };

        for package in &config.packages {
            push(self.resolve(&package.target));
        }
        for assembly in &config.assemblies {
            push(self.resolve(&assembly.target));
        }
        for manipulation in &config.asset_manipulations {
            // A move deletes the resolved (possibly hash-suffixed) source.
            if manipulation.operation == AssetOperation::Move {
                if let Some(source) = &manipulation.source {
                    let requested = self.resolve(source);
                    push(resolve_cache_source(&requested).unwrap_or(requested));
                }
            }
            push(self.resolve(&manipulation.target));
        }
        for patch in &config.code_patches {
            push(self.resolve(&patch.file));
        }
        paths
    }

    /// Rollback problems are logged; the execution error stays the reported one.
    fn roll_back(&self, snapshot: &Backup, created: &[PathBuf], sink: &mut dyn EventSink) {
        let mut removed = 0;
        for path in created.iter().rev() {
            match fsops::remove_path(path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::error!(path = %path.display(), "rollback could not remove: {}", e)
                }
            }
        }

        // Archived directories are replaced wholesale so files the run added
        // inside them disappear too.
        for relative in &snapshot.paths {
            let path = self.resolve(relative);
            if path.is_dir() {
                if let Err(e) = fsops::remove_path(&path) {
                    tracing::error!(path = %path.display(), "rollback could not clear: {}", e);
                }
            }
        }

        let restored = match backup::restore_archive(&snapshot.path, &self.project_root) {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(
                    archive = %snapshot.path.display(),
                    "rollback restore failed, backup kept: {}",
                    e
                );
                emit(sink, PrepEvent::RolledBack { restored: 0, removed });
                return;
            }
        };
        emit(sink, PrepEvent::RolledBack { restored, removed });

        if let Err(e) = fsops::remove_path(&snapshot.path) {
            tracing::warn!(path = %snapshot.path.display(), "failed to remove backup: {}", e);
        }
    }
}

/// State of one execution pass.
struct Run<'a> {
    preparer: &'a Preparer,
    options: PrepareOptions,
    summary: PrepareSummary,
    /// Targets that did not exist before this run wrote them
    created: Vec<PathBuf>,
}

impl Run<'_> {
    fn execute(
        &mut self,
        config: &PreparationConfig,
        sink: &mut dyn EventSink,
    ) -> Result<(), PrepareError> {
        for step in Step::ORDER {
            match step {
                Step::Packages => {
                    emit(sink, PrepEvent::StepStarted { step, items: config.packages.len() });
                    for package in &config.packages {
                        self.place("Package", &package.source, &package.target, sink)?;
                    }
                }
                Step::Assemblies => {
                    emit(sink, PrepEvent::StepStarted { step, items: config.assemblies.len() });
                    for assembly in &config.assemblies {
                        self.place("Assembly", &assembly.source, &assembly.target, sink)?;
                    }
                }
                Step::AssetManipulations => {
                    emit(
                        sink,
                        PrepEvent::StepStarted { step, items: config.asset_manipulations.len() },
                    );
                    for manipulation in &config.asset_manipulations {
                        self.manipulate(manipulation, sink)?;
                    }
                }
                Step::CodePatches => {
                    emit(sink, PrepEvent::StepStarted { step, items: config.code_patches.len() });
                    for patch in &config.code_patches {
                        self.patch(patch, sink)?;
                    }
                }
                Step::DefineSymbols => {
                    let Some(symbols) = config.define_symbols.as_ref().filter(|s| !s.is_empty())
                    else {
                        continue;
                    };
                    let items = symbols.add.len() + symbols.remove.len();
                    emit(sink, PrepEvent::StepStarted { step, items });
                    emit(
                        sink,
                        PrepEvent::DefineSymbols {
                            add: symbols.add.clone(),
                            remove: symbols.remove.clone(),
                            platform: symbols.platform.clone(),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn finish(mut self, started: Instant, sink: &mut dyn EventSink) -> PrepareSummary {
        self.summary.duration = started.elapsed();
        emit(
            sink,
            PrepEvent::Completed {
                duration: self.summary.duration,
                dry_run: self.summary.dry_run,
            },
        );
        self.summary
    }

    fn dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Copy a cached package or assembly to its target, always overwriting.
    fn place(
        &mut self,
        kind: &'static str,
        source: &str,
        target: &str,
        sink: &mut dyn EventSink,
    ) -> Result<(), PrepareError> {
        let requested = self.preparer.resolve(source);
        let source = resolve_cache_source(&requested).ok_or(PrepareError::SourceNotFound {
            kind,
            path: requested,
        })?;
        let target = self.preparer.resolve(target);
        self.copy(&source, &target, sink)
    }

    fn copy(
        &mut self,
        source: &Path,
        target: &Path,
        sink: &mut dyn EventSink,
    ) -> Result<(), PrepareError> {
        if !self.dry_run() {
            self.note_created(target);
            fsops::copy_path(source, target).map_err(|e| PrepareError::io(target, e))?;
        }
        self.summary.copied += 1;
        self.summary.touched.push(target.to_path_buf());
        emit(
            sink,
            PrepEvent::FileCopied {
                from: source.to_path_buf(),
                to: target.to_path_buf(),
            },
        );
        Ok(())
    }

    fn manipulate(
        &mut self,
        manipulation: &AssetManipulation,
        sink: &mut dyn EventSink,
    ) -> Result<(), PrepareError> {
        let target = self.preparer.resolve(&manipulation.target);
        if manipulation.operation == AssetOperation::Delete {
            return self.delete(&target, sink);
        }

        let source = manipulation
            .source
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| PrepareError::MissingSource {
                operation: manipulation.operation,
                target: manipulation.target.clone(),
            })?;
        let requested = self.preparer.resolve(source);
        let source = resolve_cache_source(&requested).ok_or(PrepareError::SourceNotFound {
            kind: "Asset",
            path: requested,
        })?;
        if target.exists() && !manipulation.overwrite {
            return Err(PrepareError::TargetExists(target));
        }

        match manipulation.operation {
            AssetOperation::Copy => self.copy(&source, &target, sink),
            AssetOperation::Move => self.move_path(&source, &target, sink),
            AssetOperation::Delete => Ok(()),
        }
    }

    fn move_path(
        &mut self,
        source: &Path,
        target: &Path,
        sink: &mut dyn EventSink,
    ) -> Result<(), PrepareError> {
        if !self.dry_run() {
            self.note_created(target);
            fsops::copy_path(source, target).map_err(|e| PrepareError::io(target, e))?;
            fsops::remove_path(source).map_err(|e| PrepareError::io(source, e))?;
        }
        self.summary.moved += 1;
        self.summary.touched.push(source.to_path_buf());
        self.summary.touched.push(target.to_path_buf());
        emit(
            sink,
            PrepEvent::FileMoved {
                from: source.to_path_buf(),
                to: target.to_path_buf(),
            },
        );
        Ok(())
    }

    fn delete(&mut self, target: &Path, sink: &mut dyn EventSink) -> Result<(), PrepareError> {
        if !target.exists() {
            tracing::debug!(path = %target.display(), "delete target already absent");
            return Ok(());
        }
        if !self.dry_run() {
            fsops::remove_path(target).map_err(|e| PrepareError::io(target, e))?;
        }
        self.summary.deleted += 1;
        self.summary.touched.push(target.to_path_buf());
        emit(sink, PrepEvent::FileDeleted { path: target.to_path_buf() });
        Ok(())
    }

    fn patch(&mut self, patch: &CodePatch, sink: &mut dyn EventSink) -> Result<(), PrepareError> {
        let preparer = self.preparer;
        let file = preparer.resolve(&patch.file);
        if !file.is_file() {
            if patch.optional {
                self.skip(file, "File not found (optional patch)".to_string(), sink);
                return Ok(());
            }
            return Err(PrepareError::PatchTargetMissing(file));
        }

        let patcher = preparer.patchers.get(patch.patch_type)?;
        let validation = patcher.validate(&file, patch);
        if validation.is_valid && !validation.target_found {
            if self.options.strict_patches || patcher.target_required(patch) {
                return Err(PrepareError::PatchTargetNotFound(file));
            }
            self.skip(file, "Target pattern not found".to_string(), sink);
            return Ok(());
        }

        let outcome = patcher.apply(&file, patch, self.dry_run());
        if !outcome.success {
            return Err(PrepareError::PatchFailed {
                file,
                message: outcome.message,
            });
        }
        // The run's own backup covers this file; the per-patch pre-image is spare.
        if let Some(id) = &outcome.rollback_id {
            patcher.cleanup_rollback(id);
        }

        if outcome.modified {
            self.summary.patched += 1;
            self.summary.touched.push(file.clone());
        } else {
            self.summary.skipped += 1;
        }
        if let Some(preview) = outcome.preview {
            self.summary.previews.push(PatchPreview {
                file: file.clone(),
                preview,
            });
        }
        emit(
            sink,
            PrepEvent::PatchApplied {
                file,
                patch_type: patch.patch_type,
                modified: outcome.modified,
                message: outcome.message,
            },
        );
        Ok(())
    }

    fn skip(&mut self, file: PathBuf, reason: String, sink: &mut dyn EventSink) {
        self.summary.skipped += 1;
        emit(sink, PrepEvent::PatchSkipped { file, reason });
    }

    fn note_created(&mut self, target: &Path) {
        if !target.exists() && !self.created.iter().any(|p| p == target) {
            self.created.push(target.to_path_buf());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PackageReference, PatchType};
    use crate::events::EventLog;
    use crate::patcher::RollbackStore;
    use std::fs;
    use tempfile::TempDir;

    fn preparer(root: &Path) -> Preparer {
        Preparer::new(root, PatcherSet::new(RollbackStore::new(root.join(".rollback"))))
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("build/preparation/cache")).unwrap();
        fs::write(root.join("build/preparation/cache/com.demo-1.0.0.tgz"), "pkg").unwrap();
        fs::create_dir_all(root.join("projects/client/Assets")).unwrap();
        fs::write(root.join("projects/client/Assets/Settings.json"), "{\"debug\":true}\n").unwrap();
        dir
    }

    fn package() -> PackageReference {
        PackageReference {
            name: "com.demo".into(),
            version: "1.0.0".into(),
            source: "build/preparation/cache/com.demo-1.0.0.tgz".into(),
            target: "projects/client/Packages/com.demo-1.0.0.tgz".into(),
        }
    }

    #[test]
    fn steps_run_in_order_and_backup_is_removed() {
        let dir = project();
        let root = dir.path();
        let mut config = PreparationConfig::new();
        config.add_package(package());
        config.add_patch(
            CodePatch::new("projects/client/Assets/Settings.json", PatchType::Json, "debug")
                .with_operation("ReplaceValue")
                .with_replace("false"),
        );
        config.add_define_symbol("RELEASE");

        let mut log = EventLog::new();
        let summary = preparer(root)
            .run(&config, PrepareOptions::default(), &mut log)
            .unwrap();

        assert_eq!(summary.copied, 1);
        assert_eq!(summary.patched, 1);
        assert!(summary.backup.is_none());
        assert_eq!(
            fs::read_to_string(root.join("projects/client/Packages/com.demo-1.0.0.tgz")).unwrap(),
            "pkg"
        );
        assert!(fs::read_to_string(root.join("projects/client/Assets/Settings.json"))
            .unwrap()
            .contains("false"));
        assert!(backup::latest(&root.join(DEFAULT_BACKUP_DIR)).is_none());

        let steps: Vec<Step> = log
            .events()
            .iter()
            .filter_map(|e| match e {
                PrepEvent::StepStarted { step, .. } => Some(*step),
                _ => None,
            })
            .collect();
        assert_eq!(steps, Step::ORDER.to_vec());
        assert!(matches!(log.events().last(), Some(PrepEvent::Completed { dry_run: false, .. })));
    }

    #[test]
    fn failure_rolls_back_and_keeps_original_error() {
        let dir = project();
        let root = dir.path();
        let settings = root.join("projects/client/Assets/Settings.json");
        let mut config = PreparationConfig::new();
        config.add_package(package());
        config.add_asset_manipulation(AssetManipulation {
            operation: AssetOperation::Delete,
            source: None,
            target: "projects/client/Assets/Settings.json".into(),
            overwrite: false,
            description: None,
        });
        config.add_patch(CodePatch::new("Assets/Missing.cs", PatchType::CSharp, "Foo"));

        let mut log = EventLog::new();
        let options = PrepareOptions {
            validate: false,
            ..Default::default()
        };
        let err = preparer(root).run(&config, options, &mut log).unwrap_err();

        assert!(matches!(err, PrepareError::PatchTargetMissing(_)));
        assert!(!root.join("projects/client/Packages/com.demo-1.0.0.tgz").exists());
        assert_eq!(fs::read_to_string(&settings).unwrap(), "{\"debug\":true}\n");
        assert!(log
            .events()
            .iter()
            .any(|e| matches!(e, PrepEvent::RolledBack { restored: 1, removed: 1 })));
    }

    #[test]
    fn dry_run_touches_nothing() {
        let dir = project();
        let root = dir.path();
        let mut config = PreparationConfig::new();
        config.add_package(package());
        config.add_patch(
            CodePatch::new("projects/client/Assets/Settings.json", PatchType::Text, "true")
                .with_replace("false"),
        );

        let options = PrepareOptions {
            dry_run: true,
            ..Default::default()
        };
        let summary = preparer(root)
            .run(&config, options, &mut crate::events::TracingSink)
            .unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.copied, 1);
        assert_eq!(summary.patched, 1);
        assert_eq!(summary.previews.len(), 1);
        assert!(!root.join("projects/client/Packages").exists());
        assert!(!root.join(DEFAULT_BACKUP_DIR).exists());
        assert_eq!(
            fs::read_to_string(root.join("projects/client/Assets/Settings.json")).unwrap(),
            "{\"debug\":true}\n"
        );
    }

    #[test]
    fn invalid_config_blocks_execution() {
        let dir = project();
        let mut config = PreparationConfig::new();
        config.add_package(PackageReference {
            source: "build/preparation/cache/absent.tgz".into(),
            ..package()
        });

        let err = preparer(dir.path())
            .run(&config, PrepareOptions::default(), &mut EventLog::new())
            .unwrap_err();
        match err {
            PrepareError::Invalid(result) => assert!(result.has_code("FILE001")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join(DEFAULT_BACKUP_DIR).exists());
    }

    #[test]
    fn patch_skips_and_strict_mode() {
        let dir = project();
        let root = dir.path();
        let mut config = PreparationConfig::new();
        config.add_patch(CodePatch::new("Assets/Optional.cs", PatchType::CSharp, "x").optional());
        config.add_patch(
            CodePatch::new("projects/client/Assets/Settings.json", PatchType::Text, "absent")
                .with_replace("y"),
        );

        let options = PrepareOptions {
            validate: false,
            ..Default::default()
        };
        let summary = preparer(root).run(&config, options, &mut EventLog::new()).unwrap();
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.patched, 0);

        let strict = PrepareOptions {
            strict_patches: true,
            ..options
        };
        let err = preparer(root).run(&config, strict, &mut EventLog::new()).unwrap_err();
        assert!(matches!(err, PrepareError::PatchTargetNotFound(_)));
    }

    #[test]
    fn copy_without_overwrite_fails_on_existing_target() {
        let dir = project();
        let root = dir.path();
        fs::write(root.join("build/preparation/cache/logo.png"), "new").unwrap();
        fs::write(root.join("projects/client/Assets/logo.png"), "old").unwrap();

        let mut config = PreparationConfig::new();
        config.add_asset_manipulation(AssetManipulation {
            operation: AssetOperation::Move,
            source: Some("build/preparation/cache/logo.png".into()),
            target: "projects/client/Assets/logo.png".into(),
            overwrite: false,
            description: None,
        });
        let options = PrepareOptions {
            validate: false,
            ..Default::default()
        };
        let err = preparer(root).run(&config, options, &mut EventLog::new()).unwrap_err();
        assert!(matches!(err, PrepareError::TargetExists(_)));
        assert!(root.join("build/preparation/cache/logo.png").exists());

        config.asset_manipulations[0].overwrite = true;
        let summary = preparer(root).run(&config, options, &mut EventLog::new()).unwrap();
        assert_eq!(summary.moved, 1);
        assert!(!root.join("build/preparation/cache/logo.png").exists());
        assert_eq!(
            fs::read_to_string(root.join("projects/client/Assets/logo.png")).unwrap(),
            "new"
        );
    }

    #[test]
    fn restore_uses_latest_backup() {
        let dir = project();
        let root = dir.path();
        let settings = root.join("projects/client/Assets/Settings.json");
        let snapshot =
            backup::create(root, &root.join(DEFAULT_BACKUP_DIR), &[settings.clone()]).unwrap();
        fs::write(&settings, "broken").unwrap();

        let restored = preparer(root).restore(None).unwrap();
        assert_eq!(restored.archive, snapshot.path);
        assert_eq!(restored.restored, 1);
        assert_eq!(fs::read_to_string(&settings).unwrap(), "{\"debug\":true}\n");
    }

    #[test]
    fn restore_without_backup_fails() {
        let dir = TempDir::new().unwrap();
        let err = preparer(dir.path()).restore(None).unwrap_err();
        assert!(matches!(err, PrepareError::Backup(BackupError::NotFound(_))));
    }
}
