//! Execution records and the per-task history pairing them

use crate::types::files::{FileCollectionSnapshot, FileContent};
use crate::types::hash::HashCode;
use crate::types::identity::BuildInvocationId;
use crate::types::values::ValueSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Identity of the code that implemented a task when it ran
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationSnapshot {
    pub type_name: String,
    /// `None` when the fingerprinter could not determine where the code came from
    pub hash: Option<HashCode>,
}

impl ImplementationSnapshot {
    pub fn new(type_name: impl Into<String>, hash: Option<HashCode>) -> Self {
        Self {
            type_name: type_name.into(),
            hash,
        }
    }
}

/// A file found in a declared output location that this task did not produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlappingOutputs {
    pub property_name: String,
    pub path: PathBuf,
}

impl OverlappingOutputs {
    /// Find the first regular file in `before_execution` that was not part of
    /// this task's outputs after its previous execution.
    ///
    /// Directories and missing entries are ignored; content changes to files
    /// the task already owned are reported as output changes instead.
    pub fn detect(
        property_name: &str,
        previous_execution: Option<&FileCollectionSnapshot>,
        before_execution: &FileCollectionSnapshot,
    ) -> Option<Self> {
        before_execution
            .entries()
            .find(|(normalized, entry)| {
                matches!(entry.content, FileContent::RegularFile(_))
                    && !previous_execution
                        .and_then(|previous| previous.get(normalized))
                        .is_some_and(|owned| owned.content != FileContent::Missing)
            })
            .map(|(_, entry)| OverlappingOutputs {
                property_name: property_name.to_string(),
                path: entry.path.clone(),
            })
    }
}

/// Everything recorded about one execution of one task.
///
/// All mappings are ordered so that comparison, hashing and persistence never
/// depend on insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub build_invocation_id: BuildInvocationId,
    pub implementation: ImplementationSnapshot,
    pub input_properties: BTreeMap<String, ValueSnapshot>,
    pub input_files: BTreeMap<String, FileCollectionSnapshot>,
    pub output_property_names: BTreeSet<String>,
    /// Before execution: the state found on disk. Once persisted: what the task produced.
    pub output_files: Option<BTreeMap<String, FileCollectionSnapshot>>,
    pub discovered_inputs: Option<FileCollectionSnapshot>,
    pub overlapping_outputs: Option<OverlappingOutputs>,
}

impl ExecutionRecord {
    /// An empty record for a new execution in build `build_invocation_id`
    pub fn new(build_invocation_id: BuildInvocationId) -> Self {
        Self {
            build_invocation_id,
            implementation: ImplementationSnapshot::default(),
            input_properties: BTreeMap::new(),
            input_files: BTreeMap::new(),
            output_property_names: BTreeSet::new(),
            output_files: None,
            discovered_inputs: None,
            overlapping_outputs: None,
        }
    }

    /// Union of the files named by the recorded output snapshots
    pub fn output_file_paths(&self) -> BTreeSet<PathBuf> {
        self.output_files
            .iter()
            .flat_map(|outputs| outputs.values())
            .flat_map(FileCollectionSnapshot::files)
            .collect()
    }
}

/// Previous and current execution of one task, owned by a session for one build
#[derive(Debug, Clone)]
pub struct History {
    pub previous: Option<ExecutionRecord>,
    pub current: ExecutionRecord,
}

impl History {
    pub fn new(previous: Option<ExecutionRecord>, current: ExecutionRecord) -> Self {
        Self { previous, current }
    }
}
