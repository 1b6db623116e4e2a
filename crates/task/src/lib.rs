//! Task artifact state for taskstate
//!
//! This crate decides, per task and per build, whether a task's outputs are
//! still valid, which inputs changed, whether the task may execute
//! incrementally, and records the outcome once the task has run.

pub mod changes;
pub mod inputs;
pub mod repository;
pub mod session;

pub use changes::{ChangeEvaluator, Changes};
pub use inputs::{DiscoveredInputs, IncrementalTaskInputs, InputFileChange};
pub use repository::{TaskArtifactStateRepository, TaskArtifactStateRepositoryBuilder};
pub use session::{SessionState, TaskArtifactState, TaskExecutionHistory, UpToDateCheck};
