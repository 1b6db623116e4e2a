//! Per-task, per-build artifact state session
//!
//! A session moves through `Created -> Evaluated -> [InputsSelected] ->
//! finalized`. Calling an operation before the state it depends on has been
//! reached is a contract violation, reported as a fatal error rather than a
//! panic.

use crate::changes::ChangeEvaluator;
use crate::inputs::{DiscoveredInputs, IncrementalTaskInputs, InputFileChange};
use crate::repository::Collaborators;
use once_cell::unsync::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use taskstate_cache::CacheKey;
use taskstate_core::{
    BuildInvocationId, Change, Error, ExecutionRecord, FileCollectionSnapshot, FileContent,
    FileSet, History, OverlappingOutputs, Result, SnapshotProvider, TaskDescriptor, TaskIdentity,
};
use tracing::Span;

/// Outcome of the up-to-date check, frozen once computed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpToDateCheck {
    pub up_to_date: bool,
    /// One line per change, in check order; empty when up to date
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Evaluated { up_to_date: bool },
    InputsSelected,
}

/// What is known about the previous execution of a task
pub trait TaskExecutionHistory {
    /// Files produced by the previous execution, empty without history
    fn output_files(&self) -> BTreeSet<PathBuf>;

    /// The build that produced the previous execution
    fn origin_build_invocation_id(&self) -> Option<BuildInvocationId>;

    /// Foreign files found in the task's output locations before this execution
    fn overlapping_outputs(&self) -> Option<&OverlappingOutputs>;
}

/// The artifact state of one task in one build
pub struct TaskArtifactState {
    task: TaskDescriptor,
    history: History,
    collaborators: Arc<Collaborators>,
    span: Span,
    state: SessionState,
    up_to_date: Option<UpToDateCheck>,
    changes: OnceCell<Vec<Change>>,
    discovered: Option<DiscoveredInputs>,
}

impl TaskArtifactState {
    pub(crate) fn new(
        task: TaskDescriptor,
        history: History,
        collaborators: Arc<Collaborators>,
        span: Span,
    ) -> Self {
        Self {
            task,
            history,
            collaborators,
            span,
            state: SessionState::Created,
            up_to_date: None,
            changes: OnceCell::new(),
            discovered: None,
        }
    }

    pub fn identity(&self) -> &TaskIdentity {
        &self.task.identity
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn current_execution(&self) -> &ExecutionRecord {
        &self.history.current
    }

    /// Every change between the previous and current execution, evaluated once
    pub fn changes(&self) -> &[Change] {
        self.changes
            .get_or_init(|| ChangeEvaluator::from_history(&self.history).changes())
    }

    /// Whether the task's outputs are still valid, with the reasons when they are not.
    ///
    /// The first call enumerates every change; later calls return the same result.
    pub fn is_up_to_date(&mut self) -> UpToDateCheck {
        if let Some(check) = &self.up_to_date {
            return check.clone();
        }

        let span = self.span.clone();
        let _enter = span.enter();

        let messages: Vec<String> = self.changes().iter().map(Change::message).collect();
        let check = UpToDateCheck {
            up_to_date: messages.is_empty(),
            messages,
        };

        if check.up_to_date {
            tracing::info!("task is up to date");
        } else {
            tracing::info!(
                changes = check.messages.len(),
                "task is not up to date: {}",
                check.messages[0]
            );
            for message in &check.messages {
                tracing::debug!("{message}");
            }
        }

        self.state = SessionState::Evaluated {
            up_to_date: check.up_to_date,
        };
        self.up_to_date = Some(check.clone());
        check
    }

    /// Choose between incremental and full re-execution.
    ///
    /// Only valid after [`is_up_to_date`](Self::is_up_to_date) reported the
    /// task as out of date.
    pub fn select_incremental_inputs(&mut self) -> Result<IncrementalTaskInputs> {
        match self.state {
            SessionState::Created => {
                return Err(contract_violation(
                    "select_incremental_inputs",
                    "is_up_to_date() must be called first",
                ))
            }
            SessionState::Evaluated { up_to_date: true } => {
                return Err(contract_violation(
                    "select_incremental_inputs",
                    "the task is up to date and must not execute",
                ))
            }
            SessionState::Evaluated { up_to_date: false } | SessionState::InputsSelected => {}
        }

        let span = self.span.clone();
        let _enter = span.enter();

        let discovered = self
            .discovered
            .get_or_insert_with(DiscoveredInputs::new)
            .clone();

        let inputs = if self.requires_rebuild() {
            tracing::debug!("executing non-incrementally");
            IncrementalTaskInputs::Rebuild { discovered }
        } else {
            let changes = self.input_file_changes();
            tracing::debug!(changes = changes.len(), "executing incrementally");
            IncrementalTaskInputs::ChangesOnly {
                changes,
                discovered,
            }
        };

        self.state = SessionState::InputsSelected;
        Ok(inputs)
    }

    // Both read the enumeration cached by `is_up_to_date`
    fn requires_rebuild(&self) -> bool {
        self.changes().iter().any(Change::is_rebuild_trigger)
    }

    fn input_file_changes(&self) -> Vec<InputFileChange> {
        self.changes()
            .iter()
            .filter_map(|change| match change {
                Change::InputFile {
                    property_name,
                    change,
                } => Some(InputFileChange {
                    property_name: property_name.clone(),
                    change: change.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Cache key of the current execution, independent of the up-to-date verdict
    pub fn compute_cache_key(&self) -> Result<CacheKey> {
        let _enter = self.span.enter();
        self.collaborators
            .cache_keys
            .calculate(&self.history.current)
            .inspect_err(|e| {
                if e.is_not_cacheable() {
                    tracing::warn!("task is not cacheable: {e}");
                }
            })
    }

    /// Results of this engine's sessions may always be reused from a cache
    pub fn is_allowed_to_use_cached_results(&self) -> bool {
        true
    }

    pub fn execution_history(&self) -> &dyn TaskExecutionHistory {
        self
    }

    /// Record the outcome of the task's execution.
    ///
    /// Nothing is written when the task failed or was up to date. Otherwise
    /// the output files are snapshotted and the current execution replaces
    /// the previous one in the history store.
    pub fn finalize(self, failure: Option<&dyn std::error::Error>) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();

        let up_to_date = match self.state {
            SessionState::Created => {
                return Err(contract_violation(
                    "finalize",
                    "is_up_to_date() must be called before finalize()",
                ))
            }
            SessionState::Evaluated { up_to_date } => up_to_date,
            SessionState::InputsSelected => false,
        };

        if let Some(failure) = failure {
            tracing::info!("task failed, keeping previous history: {failure}");
            return Ok(());
        }
        if up_to_date {
            tracing::debug!("task was up to date, history unchanged");
            return Ok(());
        }

        let TaskArtifactState {
            task,
            history,
            collaborators,
            discovered,
            ..
        } = self;
        let History {
            previous,
            mut current,
        } = history;
        let snapshots = collaborators.snapshots.as_ref();

        // Inputs discovered during this execution replace the re-snapshotted ones
        if let Some(discovered) = discovered {
            current.discovered_inputs = snapshot_discovered(snapshots, discovered.files())?;
        }

        let mut outputs = BTreeMap::new();
        for (name, files) in &task.output_files {
            let after = snapshots.snapshot(files)?;
            let after = match &current.overlapping_outputs {
                Some(_) => produced_outputs(
                    &after,
                    current.output_files.as_ref().and_then(|before| before.get(name)),
                    previous
                        .as_ref()
                        .and_then(|p| p.output_files.as_ref())
                        .and_then(|owned| owned.get(name)),
                ),
                None => after,
            };
            outputs.insert(name.clone(), after);
        }
        current.output_files = Some(outputs);

        collaborators.history.update(&task.identity, &current)?;
        tracing::info!(
            build = %current.build_invocation_id,
            "recorded task execution history"
        );
        Ok(())
    }
}

impl TaskExecutionHistory for TaskArtifactState {
    fn output_files(&self) -> BTreeSet<PathBuf> {
        self.history
            .previous
            .as_ref()
            .map(ExecutionRecord::output_file_paths)
            .unwrap_or_default()
    }

    fn origin_build_invocation_id(&self) -> Option<BuildInvocationId> {
        self.history
            .previous
            .as_ref()
            .map(|previous| previous.build_invocation_id)
    }

    fn overlapping_outputs(&self) -> Option<&OverlappingOutputs> {
        self.history.current.overlapping_outputs.as_ref()
    }
}

impl fmt::Debug for TaskArtifactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskArtifactState")
            .field("task", &self.task.identity)
            .field("state", &self.state)
            .field("has_history", &self.history.previous.is_some())
            .finish_non_exhaustive()
    }
}

fn contract_violation(operation: &'static str, message: &str) -> Error {
    let error = Error::contract_violation(operation, message);
    tracing::error!("{error}");
    error
}

/// Snapshot of discovered input files, `None` when there are none
pub(crate) fn snapshot_discovered(
    snapshots: &dyn SnapshotProvider,
    files: BTreeSet<PathBuf>,
) -> Result<Option<FileCollectionSnapshot>> {
    if files.is_empty() {
        return Ok(None);
    }
    snapshots.snapshot(&FileSet::new(files)).map(Some)
}

/// Entries of `after` that this task is responsible for: files it owned after
/// its previous execution, and files it created or modified during this one.
fn produced_outputs(
    after: &FileCollectionSnapshot,
    before: Option<&FileCollectionSnapshot>,
    owned: Option<&FileCollectionSnapshot>,
) -> FileCollectionSnapshot {
    let mut produced = FileCollectionSnapshot::empty();
    for (normalized, entry) in after.entries() {
        let was_owned = owned
            .and_then(|owned| owned.get(normalized))
            .is_some_and(|owned| owned.content != FileContent::Missing);
        let touched = match before.and_then(|before| before.get(normalized)) {
            None => true,
            Some(existing) => {
                existing.content == FileContent::Missing || existing.content != entry.content
            }
        };
        if was_owned || touched {
            produced.insert(normalized, entry.path.clone(), entry.content);
        }
    }
    produced
}
