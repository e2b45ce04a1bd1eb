//! Progress notifications for a preparation run.
//!
//! Components never publish to a global bus; the caller hands an
//! [`EventSink`] to the operation and every sub-step is reported through it.
//! [`emit`] also mirrors each event to `tracing`.

use crate::config::PatchType;
use crate::validation::ValidationLevel;
use std::path::PathBuf;
use std::time::Duration;

/// Orchestrator step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Packages,
    Assemblies,
    AssetManipulations,
    CodePatches,
    DefineSymbols,
}

impl Step {
    pub const ORDER: [Step; 5] = [
        Step::Packages,
        Step::Assemblies,
        Step::AssetManipulations,
        Step::CodePatches,
        Step::DefineSymbols,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Step::Packages => "packages",
            Step::Assemblies => "assemblies",
            Step::AssetManipulations => "asset manipulations",
            Step::CodePatches => "code patches",
            Step::DefineSymbols => "define symbols",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrepEvent {
    ValidationStarted {
        level: ValidationLevel,
    },
    ValidationFinished {
        is_valid: bool,
        errors: usize,
        warnings: usize,
    },
    BackupCreated {
        path: PathBuf,
        entries: usize,
    },
    StepStarted {
        step: Step,
        items: usize,
    },
    FileCopied {
        from: PathBuf,
        to: PathBuf,
    },
    FileMoved {
        from: PathBuf,
        to: PathBuf,
    },
    FileDeleted {
        path: PathBuf,
    },
    PatchApplied {
        file: PathBuf,
        patch_type: PatchType,
        modified: bool,
        message: String,
    },
    PatchSkipped {
        file: PathBuf,
        reason: String,
    },
    DefineSymbols {
        add: Vec<String>,
        remove: Vec<String>,
        platform: Option<String>,
    },
    RolledBack {
        restored: usize,
        removed: usize,
    },
    Completed {
        duration: Duration,
        dry_run: bool,
    },
    Failed {
        error: String,
    },
}

/// Receiver of [`PrepEvent`]s.
pub trait EventSink {
    fn on_event(&mut self, event: &PrepEvent);
}

impl<F: FnMut(&PrepEvent)> EventSink for F {
    fn on_event(&mut self, event: &PrepEvent) {
        self(event)
    }
}

/// Sink that only relies on the `tracing` mirror done by [`emit`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_event(&mut self, _event: &PrepEvent) {}
}

/// Accumulates events for the caller to drain after the run.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<PrepEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[PrepEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<PrepEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for EventLog {
    fn on_event(&mut self, event: &PrepEvent) {
        self.events.push(event.clone());
    }
}

/// Deliver `event` to `sink` and log it.
pub fn emit(sink: &mut dyn EventSink, event: PrepEvent) {
    trace_event(&event);
    sink.on_event(&event);
}

fn trace_event(event: &PrepEvent) {
    match event {
        PrepEvent::ValidationStarted { level } => {
            tracing::info!(%level, "validation started")
        }
        PrepEvent::ValidationFinished { is_valid, errors, warnings } => {
            tracing::info!(is_valid, errors, warnings, "validation finished")
        }
        PrepEvent::BackupCreated { path, entries } => {
            tracing::info!(path = %path.display(), entries, "backup created")
        }
        PrepEvent::StepStarted { step, items } => {
            tracing::info!(step = step.label(), items, "step started")
        }
        PrepEvent::FileCopied { from, to } => {
            tracing::debug!(from = %from.display(), to = %to.display(), "copied")
        }
        PrepEvent::FileMoved { from, to } => {
            tracing::debug!(from = %from.display(), to = %to.display(), "moved")
        }
        PrepEvent::FileDeleted { path } => {
            tracing::debug!(path = %path.display(), "deleted")
        }
        PrepEvent::PatchApplied { file, patch_type, modified, message } => {
            tracing::info!(file = %file.display(), %patch_type, modified, "{}", message)
        }
        PrepEvent::PatchSkipped { file, reason } => {
            tracing::warn!(file = %file.display(), "patch skipped: {}", reason)
        }
        PrepEvent::DefineSymbols { add, remove, platform } => tracing::info!(
            add = ?add,
            remove = ?remove,
            platform = platform.as_deref().unwrap_or("current"),
            "define symbols requested"
        ),
        PrepEvent::RolledBack { restored, removed } => {
            tracing::warn!(restored, removed, "rolled back")
        }
        PrepEvent::Completed { duration, dry_run } => {
            let elapsed_ms = duration.as_millis() as u64;
            tracing::info!(elapsed_ms, dry_run, "preparation completed")
        }
        PrepEvent::Failed { error } => tracing::error!("preparation failed: {}", error),
    }
}
