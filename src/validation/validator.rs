use crate::cache::naming::has_version_separator;
use crate::cache::resolve_cache_source;
use crate::config::{AssetOperation, PatchType, PreparationConfig};
use crate::pattern;
use crate::validation::{ValidationIssue, ValidationLevel, ValidationResult};
use std::path::{Path, PathBuf};

/// Read-only checks of a preparation config against a project tree.
#[derive(Debug, Clone)]
pub struct Validator {
    project_root: PathBuf,
}

impl Validator {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Run every level up to and including `level`.
    pub fn validate(&self, config: &PreparationConfig, level: ValidationLevel) -> ValidationResult {
        tracing::info!(%level, "validating preparation config");
        let mut result = ValidationResult::new(level);

        for current in ValidationLevel::ALL.into_iter().filter(|l| *l <= level) {
            match current {
                ValidationLevel::Schema => self.check_schema(config, &mut result),
                ValidationLevel::FileExistence => self.check_files(config, &mut result),
                ValidationLevel::FormatSpecific => self.check_packages(config, &mut result),
                ValidationLevel::Full => self.check_patches(config, &mut result),
            }
            tracing::debug!(
                level = %current,
                errors = result.errors.len(),
                warnings = result.warnings.len(),
                "validation level complete"
            );
        }

        result.finish();
        tracing::info!("{}", result.summary);
        result
    }

    /// Project path, tolerating a hash-suffixed cache entry.
    fn resolve_source(&self, relative: &str) -> Option<PathBuf> {
        resolve_cache_source(&self.project_root.join(relative))
    }

    fn target_path(&self, relative: &str) -> PathBuf {
        self.project_root.join(relative)
    }

    fn check_schema(&self, config: &PreparationConfig, result: &mut ValidationResult) {
        if blank(&config.version) {
            result.error(ValidationIssue::new(
                "SCHEMA001",
                "Configuration version is required",
            ));
        }

        for package in &config.packages {
            if blank(&package.name) {
                result.error(ValidationIssue::new("SCHEMA002", "Package name is required"));
            }
            if blank(&package.version) {
                result.error(ValidationIssue::new(
                    "SCHEMA003",
                    format!("Package version is required for: {}", package.name),
                ));
            }
            if blank(&package.source) {
                result.error(ValidationIssue::new(
                    "SCHEMA004",
                    format!("Package source path is required for: {}", package.name),
                ));
            }
            if blank(&package.target) {
                result.error(ValidationIssue::new(
                    "SCHEMA005",
                    format!("Package target path is required for: {}", package.name),
                ));
            }
        }

        for assembly in &config.assemblies {
            if blank(&assembly.name) {
                result.error(ValidationIssue::new("SCHEMA006", "Assembly name is required"));
            }
            if blank(&assembly.source) {
                result.error(ValidationIssue::new(
                    "SCHEMA007",
                    format!("Assembly source path is required for: {}", assembly.name),
                ));
            }
            if blank(&assembly.target) {
                result.error(ValidationIssue::new(
                    "SCHEMA008",
                    format!("Assembly target path is required for: {}", assembly.name),
                ));
            }
        }

        for patch in &config.code_patches {
            if blank(&patch.file) {
                result.error(ValidationIssue::new(
                    "SCHEMA009",
                    "Code patch file path is required",
                ));
            }
            // an empty JSON path addresses the document root
            if blank(&patch.search) && patch.patch_type != PatchType::Json {
                result.error(ValidationIssue::new(
                    "SCHEMA010",
                    format!("Code patch search pattern is required for: {}", patch.file),
                ));
            }
        }

        for manipulation in &config.asset_manipulations {
            if blank(&manipulation.target) {
                result.error(ValidationIssue::new(
                    "SCHEMA011",
                    format!("{} manipulation target path is required", manipulation.operation),
                ));
            }
            let needs_source = matches!(
                manipulation.operation,
                AssetOperation::Copy | AssetOperation::Move
            );
            if needs_source && manipulation.source.as_deref().map_or(true, blank) {
                result.error(ValidationIssue::new(
                    "SCHEMA012",
                    format!(
                        "{} operation requires a source for: {}",
                        manipulation.operation, manipulation.target
                    ),
                ));
            }
        }
    }

    fn check_files(&self, config: &PreparationConfig, result: &mut ValidationResult) {
        for package in config.packages.iter().filter(|p| !blank(&p.source)) {
            if self.resolve_source(&package.source).is_none() {
                result.error(
                    ValidationIssue::new(
                        "FILE001",
                        format!("Package source file not found: {}", package.source),
                    )
                    .with_file(&package.source),
                );
            }
        }

        for assembly in config.assemblies.iter().filter(|a| !blank(&a.source)) {
            if self.resolve_source(&assembly.source).is_none() {
                result.error(
                    ValidationIssue::new(
                        "FILE002",
                        format!("Assembly source file not found: {}", assembly.source),
                    )
                    .with_file(&assembly.source),
                );
            }
        }

        for patch in config.code_patches.iter().filter(|p| !blank(&p.file)) {
            if self.target_path(&patch.file).is_file() {
                continue;
            }
            if patch.optional {
                result.warning(
                    ValidationIssue::new(
                        "FILE003",
                        format!("Optional patch target file not found: {}", patch.file),
                    )
                    .with_file(&patch.file),
                );
            } else {
                result.error(
                    ValidationIssue::new(
                        "FILE004",
                        format!("Patch target file not found: {}", patch.file),
                    )
                    .with_file(&patch.file),
                );
            }
        }

        for manipulation in &config.asset_manipulations {
            let Some(source) = manipulation.source.as_deref().filter(|s| !blank(s)) else {
                continue;
            };
            if manipulation.operation == AssetOperation::Delete {
                continue;
            }
            if self.resolve_source(source).is_none() {
                result.error(
                    ValidationIssue::new(
                        "FILE005",
                        format!("{} source not found: {}", manipulation.operation, source),
                    )
                    .with_file(source),
                );
            }
        }
    }

    fn check_packages(&self, config: &PreparationConfig, result: &mut ValidationResult) {
        for package in config.packages.iter().filter(|p| !blank(&p.source)) {
            // missing sources were reported by the file level
            let Some(path) = self.resolve_source(&package.source) else {
                continue;
            };
            if path.is_dir() {
                continue;
            }

            let file_name = file_name_of(&path);
            if !file_name.to_ascii_lowercase().ends_with(".tgz") {
                result.error(
                    ValidationIssue::new(
                        "PKG001",
                        format!("Package must be a .tgz file: {}", package.source),
                    )
                    .with_file(&package.source),
                );
                continue;
            }

            if path.metadata().map(|m| m.len() == 0).unwrap_or(false) {
                result.error(
                    ValidationIssue::new(
                        "PKG002",
                        format!("Package file is empty: {}", package.source),
                    )
                    .with_file(&package.source),
                );
            }

            if !has_version_separator(&file_name) {
                result.warning(
                    ValidationIssue::new(
                        "PKG003",
                        format!(
                            "Package filename should follow 'name-version' convention: {}",
                            package.source
                        ),
                    )
                    .with_file(&package.source),
                );
            }
        }
    }

    fn check_patches(&self, config: &PreparationConfig, result: &mut ValidationResult) {
        for patch in config.code_patches.iter().filter(|p| !blank(&p.file)) {
            let path = self.target_path(&patch.file);
            if !path.is_file() {
                continue;
            }

            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            let expected = patch.patch_type.extensions();
            if !expected.is_empty() && !expected.contains(&extension.as_str()) {
                result.warning(
                    ValidationIssue::new(
                        "PATCH001",
                        format!(
                            "Patch type '{}' may not match file extension '.{}': {}",
                            patch.patch_type, extension, patch.file
                        ),
                    )
                    .with_file(&patch.file),
                );
            }

            if patch.patch_type == PatchType::Text
                && !blank(&patch.search)
                && pattern::looks_like_regex(&patch.search)
            {
                if let Err(e) = pattern::get_or_compile(&patch.search) {
                    result.error(
                        ValidationIssue::new(
                            "PATCH002",
                            format!("Invalid regex pattern in patch search: {}", e),
                        )
                        .with_file(&patch.file)
                        .with_context(&patch.search),
                    );
                }
            }
        }
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
