//! Persistent, key-addressed store of task execution history
//!
//! The store holds one "previous execution" per task identity. Sessions read
//! it once when they start and replace it once, atomically, when a task
//! finishes successfully. Reads never fail: a record that is missing,
//! unreadable or from another format version is reported as absent, which
//! makes the task rebuild from scratch.

mod file;
mod memory;

pub use file::FileHistoryStore;
pub use memory::InMemoryHistoryStore;

use taskstate_core::{BuildInvocationId, ExecutionRecord, History, Result, TaskIdentity};

/// Shared store of previous executions, safe for concurrent use by many sessions
pub trait HistoryStore: Send + Sync {
    /// The persisted previous execution of `task`, if a usable one exists
    fn previous_execution(&self, task: &TaskIdentity) -> Option<ExecutionRecord>;

    /// Atomically replace the previous execution of `task` with `record`.
    ///
    /// On error the previously persisted record is left untouched.
    fn update(&self, task: &TaskIdentity, record: &ExecutionRecord) -> Result<()>;

    /// Previous execution of `task` paired with a fresh current execution for this build
    fn get_history(&self, task: &TaskIdentity, build_invocation_id: BuildInvocationId) -> History {
        History::new(
            self.previous_execution(task),
            ExecutionRecord::new(build_invocation_id),
        )
    }
}
