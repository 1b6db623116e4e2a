//! Classified differences between a previous and a current execution

use crate::types::execution::OverlappingOutputs;
use crate::types::files::FileChange;
use std::fmt;

/// Category of a [`Change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeCategory {
    NoHistory,
    ImplementationChanged,
    InputValueChanged,
    InputFileChanged,
    OutputFileChanged,
    OverlappingOutputsDetected,
    DiscoveredInputChanged,
}

impl ChangeCategory {
    /// Whether a change of this category rules out incremental execution
    pub fn is_rebuild_trigger(self) -> bool {
        !matches!(
            self,
            ChangeCategory::InputFileChanged | ChangeCategory::DiscoveredInputChanged
        )
    }
}

/// How the implementation of a task differs from its previous execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImplementationChange {
    TypeChanged { previous: String, current: String },
    CodeChanged { type_name: String },
    UnknownProvenance { type_name: String },
}

/// How an input property value differs from its previous execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueChangeKind {
    Added,
    Removed,
    Modified,
    Unstable,
}

/// A single classified difference. Recomputed every session, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    NoHistory,
    Implementation(ImplementationChange),
    OverlappingOutputs(OverlappingOutputs),
    InputValue {
        property_name: String,
        kind: ValueChangeKind,
    },
    InputFile {
        property_name: String,
        change: FileChange,
    },
    OutputFile {
        property_name: String,
        change: FileChange,
    },
    DiscoveredInput(FileChange),
}

impl Change {
    pub fn category(&self) -> ChangeCategory {
        match self {
            Change::NoHistory => ChangeCategory::NoHistory,
            Change::Implementation(_) => ChangeCategory::ImplementationChanged,
            Change::OverlappingOutputs(_) => ChangeCategory::OverlappingOutputsDetected,
            Change::InputValue { .. } => ChangeCategory::InputValueChanged,
            Change::InputFile { .. } => ChangeCategory::InputFileChanged,
            Change::OutputFile { .. } => ChangeCategory::OutputFileChanged,
            Change::DiscoveredInput(_) => ChangeCategory::DiscoveredInputChanged,
        }
    }

    pub fn is_rebuild_trigger(&self) -> bool {
        self.category().is_rebuild_trigger()
    }

    /// The human-readable, single-line description of this change
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::NoHistory => write!(f, "No history is available."),
            Change::Implementation(ImplementationChange::TypeChanged { previous, current }) => {
                write!(
                    f,
                    "Task implementation has changed from '{previous}' to '{current}'."
                )
            }
            Change::Implementation(ImplementationChange::CodeChanged { type_name }) => {
                write!(f, "Code of task implementation '{type_name}' has changed.")
            }
            Change::Implementation(ImplementationChange::UnknownProvenance { type_name }) => {
                write!(
                    f,
                    "Task implementation '{type_name}' was loaded from an unknown location."
                )
            }
            Change::OverlappingOutputs(overlap) => write!(
                f,
                "Output property '{}' contains '{}', which was not produced by this task.",
                overlap.property_name,
                overlap.path.display()
            ),
            Change::InputValue {
                property_name,
                kind,
            } => match kind {
                ValueChangeKind::Added => {
                    write!(f, "Input property '{property_name}' has been added.")
                }
                ValueChangeKind::Removed => {
                    write!(f, "Input property '{property_name}' has been removed.")
                }
                ValueChangeKind::Modified => {
                    write!(f, "Value of input property '{property_name}' has changed.")
                }
                ValueChangeKind::Unstable => write!(
                    f,
                    "Value of input property '{property_name}' cannot be captured deterministically."
                ),
            },
            Change::InputFile {
                property_name,
                change,
            } => write!(
                f,
                "Input file '{}' of property '{}' has been {}.",
                change.path.display(),
                property_name,
                change.kind
            ),
            Change::OutputFile {
                property_name,
                change,
            } => write!(
                f,
                "Output file '{}' of property '{}' has been {}.",
                change.path.display(),
                property_name,
                change.kind
            ),
            Change::DiscoveredInput(change) => write!(
                f,
                "Discovered input file '{}' has been {}.",
                change.path.display(),
                change.kind
            ),
        }
    }
}
