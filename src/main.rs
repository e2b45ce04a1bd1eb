use anyhow::{Context, Result};
use build_prep::batch::{BatchOptions, BatchProcessor, BatchResult};
use build_prep::cache::ContentCache;
use build_prep::config::{
    load_from_path, save_to_path, AssemblyReference, CodePatch, PackageReference, PatchMode,
    PatchType, PreparationConfig,
};
use build_prep::events::{PrepEvent, Step};
use build_prep::logging;
use build_prep::manifest::{BatchManifest, ItemType, PreparationManifest};
use build_prep::patcher::{PatcherSet, RollbackStore};
use build_prep::prepare::{PrepareError, PrepareOptions, Preparer};
use build_prep::sources::{add_injection, SourceManager};
use build_prep::validation::{ValidationLevel, ValidationResult, Validator};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::de::DeserializeOwned;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "build-prep")]
#[command(about = "Prepare a game-client project tree for a build", long_about = None)]
#[command(version)]
struct Cli {
    /// Project root (auto-detected if not specified)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run or undo a preparation
    #[command(subcommand)]
    Prepare(PrepareCommand),

    /// Validate a preparation config
    Validate {
        #[arg(short, long)]
        config: PathBuf,

        /// schema, file-existence, format-specific or full
        #[arg(short, long, default_value = "full")]
        level: ValidationLevel,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the content cache
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Edit a preparation config
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Collect sources into the cache
    #[command(subcommand)]
    Source(SourceCommand),

    /// Map a cached item onto a project target
    Inject {
        #[arg(short, long)]
        config: PathBuf,

        /// Cache path, project-relative
        #[arg(short, long)]
        source: String,

        /// Target path, project-relative
        #[arg(short, long)]
        target: String,

        /// package, assembly or asset
        #[arg(long = "type")]
        item_type: ItemType,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        version: Option<String>,
    },

    /// Process a batch manifest
    #[command(subcommand)]
    Batch(BatchCommand),
}

#[derive(Subcommand)]
enum PrepareCommand {
    /// Execute a preparation config
    Run {
        #[arg(short, long)]
        config: PathBuf,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Skip pre-flight validation
        #[arg(long)]
        no_validate: bool,

        /// Fail when a patch target pattern is not found
        #[arg(long)]
        strict: bool,

        /// Show patch previews (dry run)
        #[arg(short, long)]
        diff: bool,
    },

    /// Restore a backup (the most recent one by default)
    Restore {
        #[arg(short, long)]
        backup: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Copy packages and assemblies from a directory into the cache
    Populate {
        #[arg(short, long)]
        source: PathBuf,

        /// Also register the items in this config
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List cached items
    List,

    /// Remove cached files
    Clean,
}

#[derive(Args)]
struct ConfigPath {
    #[arg(short, long)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write an empty config
    Create {
        #[command(flatten)]
        path: ConfigPath,

        #[arg(long)]
        description: Option<String>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    AddPackage {
        #[command(flatten)]
        path: ConfigPath,
        #[arg(long)]
        name: String,
        #[arg(long)]
        version: String,
        #[arg(long)]
        source: String,
        #[arg(long)]
        target: String,
    },

    AddAssembly {
        #[command(flatten)]
        path: ConfigPath,
        #[arg(long)]
        name: String,
        #[arg(long)]
        version: Option<String>,
        #[arg(long)]
        source: String,
        #[arg(long)]
        target: String,
    },

    AddPatch {
        #[command(flatten)]
        path: ConfigPath,
        #[arg(long)]
        file: String,
        /// CSharp, Json, UnityAsset or Text
        #[arg(long = "type", value_parser = parse_enum::<PatchType>)]
        patch_type: PatchType,
        #[arg(long)]
        search: String,
        #[arg(long, default_value = "")]
        replace: String,
        #[arg(long)]
        operation: Option<String>,
        /// Replace, InsertBefore, InsertAfter or Delete
        #[arg(long, value_parser = parse_enum::<PatchMode>)]
        mode: Option<PatchMode>,
        #[arg(long)]
        optional: bool,
        #[arg(long)]
        description: Option<String>,
    },

    /// Schedule a scripting define symbol for addition (or removal)
    AddDefine {
        #[command(flatten)]
        path: ConfigPath,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        remove: bool,
    },

    RemovePackage {
        #[command(flatten)]
        path: ConfigPath,
        #[arg(long)]
        name: String,
        #[arg(long)]
        version: Option<String>,
    },

    RemoveAssembly {
        #[command(flatten)]
        path: ConfigPath,
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum SourceCommand {
    /// Copy a file or directory into the cache and record it
    Add {
        #[arg(short, long)]
        manifest: PathBuf,
        #[arg(short, long)]
        source: String,
        #[arg(long)]
        cache_as: String,
        /// package, assembly or asset
        #[arg(long = "type")]
        item_type: ItemType,
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
}

#[derive(Args)]
struct BatchArgs {
    /// Batch manifest (.json, .yaml or .yml)
    #[arg(short, long)]
    manifest: PathBuf,

    /// Manifest or config receiving the items
    #[arg(short, long)]
    target: PathBuf,

    #[arg(long)]
    continue_on_error: bool,

    #[arg(short = 'n', long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum BatchCommand {
    /// Add every source to a preparation manifest
    Sources(BatchArgs),
    /// Register every item as an injection in a preparation config
    Injections(BatchArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let project = resolve_project(cli.project)?;

    match cli.command {
        Commands::Prepare(PrepareCommand::Run {
            config,
            dry_run,
            no_validate,
            strict,
            diff,
        }) => {
            let options = PrepareOptions {
                dry_run,
                validate: !no_validate,
                strict_patches: strict,
            };
            cmd_prepare_run(&project, &config, options, diff)
        }
        Commands::Prepare(PrepareCommand::Restore { backup }) => {
            cmd_restore(&project, backup.as_deref())
        }
        Commands::Validate {
            config,
            level,
            json,
        } => cmd_validate(&project, &config, level, json),
        Commands::Cache(command) => cmd_cache(&project, command),
        Commands::Config(command) => cmd_config(&project, command),
        Commands::Source(SourceCommand::Add {
            manifest,
            source,
            cache_as,
            item_type,
            dry_run,
        }) => cmd_source_add(&project, &manifest, &source, &cache_as, item_type, dry_run),
        Commands::Inject {
            config,
            source,
            target,
            item_type,
            name,
            version,
        } => {
            let path = project.join(config);
            let mut loaded = load_from_path(&path)?;
            add_injection(
                &mut loaded,
                &source,
                &target,
                item_type,
                name.as_deref(),
                version.as_deref(),
            )?;
            save_to_path(&loaded, &path)?;
            println!("{} Added {} injection: {} -> {}", "✓".green(), item_type, source, target);
            Ok(())
        }
        Commands::Batch(command) => cmd_batch(&project, command),
    }
}

/// Resolve the project root.
///
/// Priority order:
/// 1. Explicit --project flag
/// 2. BUILD_PREP_PROJECT environment variable
/// 3. Nearest ancestor of the current directory holding `.git`
/// 4. The current directory
fn resolve_project(cli_project: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_project {
        return path
            .canonicalize()
            .with_context(|| format!("project root not found: {}", path.display()));
    }

    if let Ok(env_path) = env::var("BUILD_PREP_PROJECT") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: BUILD_PREP_PROJECT is set but path doesn't exist: {}",
                env_path
            )
            .yellow()
        );
    }

    let current = env::current_dir()?;
    Ok(current
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
        .unwrap_or(current))
}

/// Parse a config enum by its serialized name or alias.
fn parse_enum<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("unknown value '{}'", value))
}

fn preparer(project: &Path) -> Preparer {
    let rollback = RollbackStore::new(project.join("build/preparation/rollback"));
    Preparer::new(project, PatcherSet::new(rollback))
}

fn cmd_prepare_run(
    project: &Path,
    config_path: &Path,
    options: PrepareOptions,
    show_diff: bool,
) -> Result<()> {
    let config = load_from_path(project.join(config_path))?;

    println!("Project: {}", project.display());
    println!("Config: {}", config_path.display());
    if options.dry_run {
        println!("{}", "[DRY RUN - no files will be modified]".cyan());
    }
    println!();

    let mut report = |event: &PrepEvent| print_event(event, options.dry_run);
    let summary = match preparer(project).run(&config, options, &mut report) {
        Ok(summary) => summary,
        Err(PrepareError::Invalid(result)) => {
            print_validation(&result);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            std::process::exit(1);
        }
    };

    if show_diff {
        for preview in &summary.previews {
            println!();
            print_preview(&preview.preview);
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} copied", format!("{}", summary.copied).green());
    println!("  {} moved", format!("{}", summary.moved).green());
    println!("  {} deleted", format!("{}", summary.deleted).green());
    println!("  {} patched", format!("{}", summary.patched).green());
    println!("  {} skipped", format!("{}", summary.skipped).cyan());
    println!("  {:.2}s", summary.duration.as_secs_f64());
    if let Some(backup) = &summary.backup {
        println!("  backup kept at {}", backup.display());
    }
    Ok(())
}

fn print_event(event: &PrepEvent, dry_run: bool) {
    let verb = |done: &'static str, planned: &'static str| if dry_run { planned } else { done };
    match event {
        PrepEvent::StepStarted { step, items } if *items > 0 || *step == Step::DefineSymbols => {
            println!("{}", format!("{} ({})", capitalize(step.label()), items).bold());
        }
        PrepEvent::FileCopied { to, .. } => {
            println!("{} {} {}", "✓".green(), verb("Copied", "Would copy"), to.display());
        }
        PrepEvent::FileMoved { from, to } => println!(
            "{} {} {} -> {}",
            "✓".green(),
            verb("Moved", "Would move"),
            from.display(),
            to.display()
        ),
        PrepEvent::FileDeleted { path } => {
            println!("{} {} {}", "✓".green(), verb("Deleted", "Would delete"), path.display());
        }
        PrepEvent::PatchApplied { file, modified: true, .. } => {
            println!("{} {} {}", "✓".green(), verb("Patched", "Would patch"), file.display());
        }
        PrepEvent::PatchApplied { file, modified: false, .. } => {
            println!("{} Already applied to {}", "⊙".yellow(), file.display());
        }
        PrepEvent::PatchSkipped { file, reason } => {
            println!("{} {}: Skipped ({})", "⊘".cyan(), file.display(), reason);
        }
        PrepEvent::DefineSymbols { add, remove, .. } => {
            for symbol in add {
                println!("{} define +{}", "⊙".yellow(), symbol);
            }
            for symbol in remove {
                println!("{} define -{}", "⊙".yellow(), symbol);
            }
        }
        PrepEvent::RolledBack { restored, removed } => eprintln!(
            "{}",
            format!("Rolled back: {} restored, {} removed", restored, removed).yellow()
        ),
        _ => {}
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn print_preview(preview: &str) {
    for line in preview.lines() {
        let styled = if line.starts_with("+++") || line.starts_with("---") {
            line.dimmed()
        } else if line.starts_with('+') {
            line.green()
        } else if line.starts_with('-') {
            line.red()
        } else {
            line.normal()
        };
        println!("{}", styled);
    }
}

fn cmd_restore(project: &Path, backup: Option<&Path>) -> Result<()> {
    let backup = backup.map(|b| project.join(b));
    let summary = preparer(project).restore(backup.as_deref())?;
    println!(
        "{} Restored {} file(s) from {}",
        "✓".green(),
        summary.restored,
        summary.archive.display()
    );
    Ok(())
}

fn cmd_validate(
    project: &Path,
    config_path: &Path,
    level: ValidationLevel,
    json: bool,
) -> Result<()> {
    let config = load_from_path(project.join(config_path))?;
    let result = Validator::new(project).validate(&config, level);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_validation(&result);
    }

    if !result.is_valid {
        std::process::exit(1);
    }
    Ok(())
}

fn print_validation(result: &ValidationResult) {
    for issue in &result.errors {
        eprintln!("{} {}", "✗".red(), issue);
        if let Some(file) = &issue.file {
            eprintln!("  File: {}", file);
        }
    }
    for issue in &result.warnings {
        println!("{} {}", "⊙".yellow(), issue);
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} error(s)", format!("{}", result.errors.len()).red());
    println!("  {} warning(s)", format!("{}", result.warnings.len()).yellow());
    if result.is_valid {
        println!("{} {}", "✓".green(), result.summary);
    } else {
        eprintln!("{} {}", "✗".red(), result.summary);
    }
}

fn cmd_cache(project: &Path, command: CacheCommand) -> Result<()> {
    let cache = ContentCache::with_default_dir(project);
    match command {
        CacheCommand::Populate { source, config } => {
            let config_path = config.map(|c| project.join(c));
            let mut loaded = config_path.as_deref().map(|p| load_from_path(p)).transpose()?;

            let items = cache.populate_from_directory(&project.join(&source), loaded.as_mut())?;
            for item in &items {
                println!(
                    "{} {} {} ({})",
                    "✓".green(),
                    item.item_type,
                    item.name,
                    item.version.as_deref().unwrap_or("-")
                );
            }
            if let (Some(path), Some(config)) = (config_path, loaded) {
                save_to_path(&config, &path)?;
                println!("Updated {}", path.display());
            }

            println!();
            println!("{}", "Summary:".bold());
            println!("  {} cached", format!("{}", items.len()).green());
        }
        CacheCommand::List => {
            let items = cache.list()?;
            if items.is_empty() {
                println!("{}", "Cache is empty".yellow());
            }
            for item in &items {
                println!(
                    "  {} {} {} {} bytes{}",
                    item.item_type,
                    item.name.bold(),
                    item.version.as_deref().unwrap_or("-"),
                    item.size,
                    item.hash
                        .as_deref()
                        .map(|h| format!(" sha256:{}", &h[..12.min(h.len())]))
                        .unwrap_or_default()
                        .dimmed()
                );
            }
        }
        CacheCommand::Clean => {
            let removed = cache.clean()?;
            println!("{} Removed {} cached file(s)", "✓".green(), removed);
        }
    }
    Ok(())
}

fn cmd_config(project: &Path, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Create {
            path,
            description,
            force,
        } => {
            let path = project.join(path.config);
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to replace it)", path.display());
            }
            let mut config = PreparationConfig::new();
            config.description = description;
            save_to_path(&config, &path)?;
            println!("{} Created {}", "✓".green(), path.display());
        }
        ConfigCommand::AddPackage {
            path,
            name,
            version,
            source,
            target,
        } => edit_config(project, &path, |config| {
            config.add_package(PackageReference {
                name: name.clone(),
                version: version.clone(),
                source: source.clone(),
                target: target.clone(),
            });
            format!("Added package {}@{}", name, version)
        })?,
        ConfigCommand::AddAssembly {
            path,
            name,
            version,
            source,
            target,
        } => edit_config(project, &path, |config| {
            config.add_assembly(AssemblyReference {
                name: name.clone(),
                version: version.clone(),
                source: source.clone(),
                target: target.clone(),
            });
            format!("Added assembly {}", name)
        })?,
        ConfigCommand::AddPatch {
            path,
            file,
            patch_type,
            search,
            replace,
            operation,
            mode,
            optional,
            description,
        } => edit_config(project, &path, |config| {
            let mut patch = CodePatch::new(file.clone(), patch_type, search.clone())
                .with_replace(replace.clone())
                .with_mode(mode.unwrap_or_default());
            patch.operation = operation.clone();
            patch.optional = optional;
            patch.description = description.clone();
            config.add_patch(patch);
            format!("Added {} patch for {}", patch_type, file)
        })?,
        ConfigCommand::AddDefine {
            path,
            symbol,
            remove,
        } => edit_config(project, &path, |config| {
            let changed = if remove {
                config.remove_define_symbol(&symbol)
            } else {
                config.add_define_symbol(&symbol)
            };
            let action = if remove { "removal" } else { "addition" };
            if changed {
                format!("Scheduled {} of {}", action, symbol)
            } else {
                format!("{} already scheduled for {}", symbol, action)
            }
        })?,
        ConfigCommand::RemovePackage {
            path,
            name,
            version,
        } => edit_config(project, &path, |config| {
            if config.remove_package(&name, version.as_deref()) {
                format!("Removed package {}", name)
            } else {
                format!("Package {} not found", name)
            }
        })?,
        ConfigCommand::RemoveAssembly { path, name } => edit_config(project, &path, |config| {
            if config.remove_assembly(&name) {
                format!("Removed assembly {}", name)
            } else {
                format!("Assembly {} not found", name)
            }
        })?,
    }
    Ok(())
}

/// Load, edit and save a config, printing what the edit reports.
fn edit_config(
    project: &Path,
    path: &ConfigPath,
    edit: impl FnOnce(&mut PreparationConfig) -> String,
) -> Result<()> {
    let path = project.join(&path.config);
    let mut config = load_from_path(&path)?;
    let message = edit(&mut config);
    save_to_path(&config, &path)?;
    println!("{} {}", "✓".green(), message);
    Ok(())
}

fn cmd_source_add(
    project: &Path,
    manifest_path: &Path,
    source: &str,
    cache_as: &str,
    item_type: ItemType,
    dry_run: bool,
) -> Result<()> {
    let manifest_path = project.join(manifest_path);
    let mut manifest = PreparationManifest::load_or_create(&manifest_path)?;
    let added = SourceManager::new(project).add_source(
        &mut manifest,
        source,
        cache_as,
        item_type,
        dry_run,
    )?;

    if dry_run {
        println!(
            "{} Would copy {} -> {}",
            "⊙".yellow(),
            added.source_path.display(),
            added.cache_relative_path
        );
        println!(
            "  {} file(s), {} directory(ies), {} bytes",
            added.stats.files, added.stats.dirs, added.stats.bytes
        );
        return Ok(());
    }

    manifest.save(&manifest_path)?;
    println!(
        "{} Added {} as {} ({})",
        "✓".green(),
        source,
        cache_as,
        added.cache_relative_path
    );
    Ok(())
}

fn cmd_batch(project: &Path, command: BatchCommand) -> Result<()> {
    let (args, injections) = match command {
        BatchCommand::Sources(args) => (args, false),
        BatchCommand::Injections(args) => (args, true),
    };

    let batch = BatchManifest::load(&project.join(&args.manifest))?;
    let validation = batch.validate();
    for warning in &validation.warnings {
        println!("{} {}", "⊙".yellow(), warning);
    }
    if !validation.is_valid() {
        for error in &validation.errors {
            eprintln!("{} {}", "✗".red(), error);
        }
        std::process::exit(1);
    }

    let options = BatchOptions {
        dry_run: args.dry_run,
        continue_on_error: args.continue_on_error,
    };
    if options.dry_run {
        println!("{}", "[DRY RUN - targets will not be modified]".cyan());
    }

    let processor = BatchProcessor::new(SourceManager::new(project));
    let target = project.join(&args.target);
    let result = if injections {
        let mut config = if target.exists() {
            load_from_path(&target)?
        } else {
            PreparationConfig::new()
        };
        let result = processor.process_injections(&batch, &mut config, options);
        if !options.dry_run {
            save_to_path(&config, &target)?;
        }
        result
    } else {
        let mut manifest = PreparationManifest::load_or_create(&target)?;
        let result = processor.process_sources(&batch, &mut manifest, options);
        if !options.dry_run {
            manifest.save(&target)?;
        }
        result
    };

    print_batch(&result, batch.total_items());
    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_batch(result: &BatchResult, total: usize) {
    for item in &result.successful_items {
        println!("{} {}", "✓".green(), item);
    }
    for failed in &result.failed_items {
        eprintln!("{} {}: {}", "✗".red(), failed.item, failed.error);
    }
    let not_attempted = total.saturating_sub(result.attempted());

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} succeeded", format!("{}", result.success_count).green());
    println!("  {} failed", format!("{}", result.failure_count).red());
    if not_attempted > 0 {
        println!("  {} not attempted", format!("{}", not_attempted).cyan());
    }
}
