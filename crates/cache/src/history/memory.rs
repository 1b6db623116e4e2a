//! In-process history store

use super::HistoryStore;
use dashmap::DashMap;
use taskstate_core::{ExecutionRecord, Result, TaskIdentity};

/// History kept in memory for the lifetime of the process.
///
/// Backed by a sharded map, so sessions for unrelated tasks never contend on a
/// single lock and each update replaces the whole record in one step.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    records: DashMap<TaskIdentity, ExecutionRecord>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks with recorded history
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn previous_execution(&self, task: &TaskIdentity) -> Option<ExecutionRecord> {
        self.records.get(task).map(|entry| entry.value().clone())
    }

    fn update(&self, task: &TaskIdentity, record: &ExecutionRecord) -> Result<()> {
        self.records.insert(task.clone(), record.clone());
        tracing::debug!(task = %task, "recorded execution in memory");
        Ok(())
    }
}
