//! Process-wide entry point handing out task artifact sessions

use crate::session::{snapshot_discovered, TaskArtifactState};
use std::collections::BTreeMap;
use std::sync::Arc;
use taskstate_cache::{
    open_history_store, CacheKeyCalculator, CanonicalJsonSnapshotter, ContentHashSnapshotter,
    HistoryConfig, HistoryStore,
};
use taskstate_core::{
    BuildInvocationId, Error, FileContent, History, ImplementationFingerprinter,
    ImplementationSnapshot, OverlappingOutputs, Result, SnapshotProvider, TaskDescriptor,
    ValueSnapshot, ValueSnapshotter,
};
use taskstate_utils::tracing::task_state_span;

/// The collaborators every session of one repository shares
pub(crate) struct Collaborators {
    pub(crate) history: Arc<dyn HistoryStore>,
    pub(crate) snapshots: Arc<dyn SnapshotProvider>,
    pub(crate) values: Arc<dyn ValueSnapshotter>,
    pub(crate) fingerprinter: Arc<dyn ImplementationFingerprinter>,
    pub(crate) cache_keys: CacheKeyCalculator,
}

impl Collaborators {
    /// Fill the current execution of `history` with the state of `task` before it runs
    fn capture_current(&self, task: &TaskDescriptor, history: &mut History) -> Result<()> {
        let previous = history.previous.as_ref();
        let current = &mut history.current;

        let hash = self.fingerprinter.fingerprint(&task.implementation);
        if hash.is_none() {
            tracing::warn!(
                implementation = %task.implementation,
                "task implementation was loaded from an unknown location"
            );
        }
        current.implementation = ImplementationSnapshot::new(task.implementation.as_str(), hash);

        for (name, value) in &task.input_properties {
            let snapshot = self.values.snapshot(value).unwrap_or_else(|e| {
                tracing::warn!(property = %name, "input value is not cacheable: {e}");
                ValueSnapshot::Unstable {
                    reason: e.to_string(),
                }
            });
            current.input_properties.insert(name.clone(), snapshot);
        }

        for (name, files) in &task.input_files {
            current
                .input_files
                .insert(name.clone(), self.snapshots.snapshot(files)?);
        }

        current.output_property_names = task.output_files.keys().cloned().collect();

        let mut before_execution = BTreeMap::new();
        for (name, files) in &task.output_files {
            let snapshot = self.snapshots.snapshot(files)?;
            if current.overlapping_outputs.is_none() {
                let owned = previous
                    .and_then(|p| p.output_files.as_ref())
                    .and_then(|outputs| outputs.get(name));
                current.overlapping_outputs = OverlappingOutputs::detect(name, owned, &snapshot);
                if let Some(overlap) = &current.overlapping_outputs {
                    tracing::warn!(
                        property = %overlap.property_name,
                        path = %overlap.path.display(),
                        "output location contains files not produced by this task"
                    );
                }
            }
            before_execution.insert(name.clone(), snapshot);
        }
        current.output_files = Some(before_execution);

        // Re-check the inputs the previous execution discovered
        if let Some(discovered) = previous.and_then(|p| p.discovered_inputs.as_ref()) {
            let files = discovered
                .entries()
                .filter(|(_, entry)| entry.content != FileContent::Directory)
                .map(|(_, entry)| entry.path.clone())
                .collect();
            current.discovered_inputs = snapshot_discovered(self.snapshots.as_ref(), files)?;
        }

        Ok(())
    }
}

/// Hands out one [`TaskArtifactState`] per task for the current build.
///
/// Shared by every task of a build; all sessions it creates record the same
/// build invocation id.
pub struct TaskArtifactStateRepository {
    collaborators: Arc<Collaborators>,
    build_invocation_id: BuildInvocationId,
}

impl TaskArtifactStateRepository {
    pub fn builder() -> TaskArtifactStateRepositoryBuilder {
        TaskArtifactStateRepositoryBuilder::default()
    }

    pub fn build_invocation_id(&self) -> BuildInvocationId {
        self.build_invocation_id
    }

    pub fn history_store(&self) -> &Arc<dyn HistoryStore> {
        &self.collaborators.history
    }

    /// Open a session for `task`: load its previous execution and snapshot its current state.
    ///
    /// Fails only when the current inputs or outputs cannot be snapshotted.
    pub fn get_state_for(&self, task: &TaskDescriptor) -> Result<TaskArtifactState> {
        let span = task_state_span(task.identity.as_str());
        let entered = span.enter();

        let mut history = self
            .collaborators
            .history
            .get_history(&task.identity, self.build_invocation_id);
        tracing::debug!(
            has_history = history.previous.is_some(),
            "loaded task history"
        );

        self.collaborators.capture_current(task, &mut history)?;

        drop(entered);
        Ok(TaskArtifactState::new(
            task.clone(),
            history,
            Arc::clone(&self.collaborators),
            span,
        ))
    }
}

/// Builder for [`TaskArtifactStateRepository`]
#[derive(Default)]
pub struct TaskArtifactStateRepositoryBuilder {
    history: Option<Arc<dyn HistoryStore>>,
    snapshots: Option<Arc<dyn SnapshotProvider>>,
    values: Option<Arc<dyn ValueSnapshotter>>,
    fingerprinter: Option<Arc<dyn ImplementationFingerprinter>>,
    build_invocation_id: Option<BuildInvocationId>,
}

impl TaskArtifactStateRepositoryBuilder {
    pub fn with_history_store(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    /// Open the history store described by `config`
    pub fn with_history_config(self, config: &HistoryConfig) -> Result<Self> {
        Ok(self.with_history_store(open_history_store(config)?))
    }

    pub fn with_snapshot_provider(mut self, snapshots: Arc<dyn SnapshotProvider>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn with_value_snapshotter(mut self, values: Arc<dyn ValueSnapshotter>) -> Self {
        self.values = Some(values);
        self
    }

    pub fn with_fingerprinter(mut self, fingerprinter: Arc<dyn ImplementationFingerprinter>) -> Self {
        self.fingerprinter = Some(fingerprinter);
        self
    }

    pub fn with_build_invocation_id(mut self, id: BuildInvocationId) -> Self {
        self.build_invocation_id = Some(id);
        self
    }

    /// Build the repository.
    ///
    /// The fingerprinter is required. Without an explicit history store the
    /// one configured through the environment is opened; snapshotting
    /// defaults to content hashing and canonical JSON.
    pub fn build(self) -> Result<TaskArtifactStateRepository> {
        let fingerprinter = self.fingerprinter.ok_or_else(|| {
            Error::configuration("an implementation fingerprinter is required")
        })?;
        let history = match self.history {
            Some(history) => history,
            None => open_history_store(&HistoryConfig::from_env()?)?,
        };
        let snapshots: Arc<dyn SnapshotProvider> = match self.snapshots {
            Some(snapshots) => snapshots,
            None => Arc::new(ContentHashSnapshotter::new()),
        };
        let values: Arc<dyn ValueSnapshotter> = match self.values {
            Some(values) => values,
            None => Arc::new(CanonicalJsonSnapshotter::new()),
        };
        let build_invocation_id = self
            .build_invocation_id
            .unwrap_or_else(BuildInvocationId::generate);

        tracing::debug!(build = %build_invocation_id, "created task artifact state repository");

        Ok(TaskArtifactStateRepository {
            collaborators: Arc::new(Collaborators {
                history,
                snapshots,
                values,
                fingerprinter,
                cache_keys: CacheKeyCalculator::new(),
            }),
            build_invocation_id,
        })
    }
}
