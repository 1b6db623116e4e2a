//! Change evaluation between the previous and current execution of a task
//!
//! Changes are produced by a fixed chain of checks, in this order:
//!
//! 1. no history
//! 2. implementation
//! 3. overlapping outputs
//! 4. input property values
//! 5. input files
//! 6. output files
//! 7. discovered inputs
//!
//! Checks run lazily as the [`Changes`] iterator is advanced, so a consumer
//! that stops at the first change never pays for the later checks. Without a
//! previous execution only the no-history change is produced.

use std::collections::{BTreeMap, BTreeSet};
use taskstate_core::{
    Change, ExecutionRecord, FileChange, FileCollectionSnapshot, History, ImplementationChange,
    ValueChangeKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    NoHistory,
    Implementation,
    OverlappingOutputs,
    InputValues,
    InputFiles,
    OutputFiles,
    DiscoveredInputs,
}

const ALL_CHECKS: &[Check] = &[
    Check::NoHistory,
    Check::Implementation,
    Check::OverlappingOutputs,
    Check::InputValues,
    Check::InputFiles,
    Check::OutputFiles,
    Check::DiscoveredInputs,
];

/// Checks whose changes rule out an incremental execution
const REBUILD_CHECKS: &[Check] = &[
    Check::NoHistory,
    Check::Implementation,
    Check::OverlappingOutputs,
    Check::InputValues,
    Check::OutputFiles,
];

const INPUT_FILE_CHECKS: &[Check] = &[Check::InputFiles];

const NO_CHECKS: &[Check] = &[];

/// Compares a previous execution, if any, with the current one
#[derive(Debug, Clone, Copy)]
pub struct ChangeEvaluator<'a> {
    previous: Option<&'a ExecutionRecord>,
    current: &'a ExecutionRecord,
}

impl<'a> ChangeEvaluator<'a> {
    pub fn new(previous: Option<&'a ExecutionRecord>, current: &'a ExecutionRecord) -> Self {
        Self { previous, current }
    }

    pub fn from_history(history: &'a History) -> Self {
        Self::new(history.previous.as_ref(), &history.current)
    }

    /// Every change, lazily, in check order
    pub fn iter(&self) -> Changes<'a> {
        Changes::new(self.previous, self.current, ALL_CHECKS)
    }

    /// Fully enumerate every change
    pub fn changes(&self) -> Vec<Change> {
        self.iter().collect()
    }

    /// Whether any change satisfies `predicate`, stopping at the first that does
    pub fn any_matching(&self, mut predicate: impl FnMut(&Change) -> bool) -> bool {
        self.iter().any(|change| predicate(&change))
    }

    /// Changes of the rebuild-triggering checks only; file-level input diffing is skipped
    pub fn rebuild_changes(&self) -> Changes<'a> {
        Changes::new(self.previous, self.current, REBUILD_CHECKS)
    }

    /// Whether a full rebuild is required, stopping at the first reason found
    pub fn requires_rebuild(&self) -> bool {
        self.rebuild_changes().any(|change| change.is_rebuild_trigger())
    }

    pub fn input_file_changes(&self) -> Changes<'a> {
        Changes::new(self.previous, self.current, INPUT_FILE_CHECKS)
    }
}

/// Lazy iterator over the changes of a [`ChangeEvaluator`]
#[derive(Debug)]
pub struct Changes<'a> {
    previous: Option<&'a ExecutionRecord>,
    current: &'a ExecutionRecord,
    checks: std::slice::Iter<'static, Check>,
    pending: std::vec::IntoIter<Change>,
    checks_run: usize,
}

impl<'a> Changes<'a> {
    fn new(
        previous: Option<&'a ExecutionRecord>,
        current: &'a ExecutionRecord,
        checks: &'static [Check],
    ) -> Self {
        Self {
            previous,
            current,
            checks: checks.iter(),
            pending: Vec::new().into_iter(),
            checks_run: 0,
        }
    }

    /// Number of checks that have run so far
    pub fn checks_run(&self) -> usize {
        self.checks_run
    }

    fn run(&mut self, check: Check) -> Vec<Change> {
        self.checks_run += 1;

        let Some(previous) = self.previous else {
            // Nothing to compare against; the remaining checks are meaningless
            self.checks = NO_CHECKS.iter();
            return match check {
                Check::NoHistory => vec![Change::NoHistory],
                _ => Vec::new(),
            };
        };
        let current = self.current;

        let changes = match check {
            Check::NoHistory => Vec::new(),
            Check::Implementation => implementation_changes(previous, current),
            Check::OverlappingOutputs => current
                .overlapping_outputs
                .iter()
                .cloned()
                .map(Change::OverlappingOutputs)
                .collect(),
            Check::InputValues => input_value_changes(previous, current),
            Check::InputFiles => {
                property_file_changes(&previous.input_files, &current.input_files)
                    .into_iter()
                    .map(|(property_name, change)| Change::InputFile {
                        property_name,
                        change,
                    })
                    .collect()
            }
            Check::OutputFiles => output_file_changes(previous, current),
            Check::DiscoveredInputs => {
                let empty = FileCollectionSnapshot::empty();
                let before = previous.discovered_inputs.as_ref().unwrap_or(&empty);
                let now = current.discovered_inputs.as_ref().unwrap_or(&empty);
                now.changes_since(before)
                    .into_iter()
                    .map(Change::DiscoveredInput)
                    .collect()
            }
        };

        tracing::trace!(?check, changes = changes.len(), "ran up-to-date check");
        changes
    }
}

impl Iterator for Changes<'_> {
    type Item = Change;

    fn next(&mut self) -> Option<Change> {
        loop {
            if let Some(change) = self.pending.next() {
                return Some(change);
            }
            let check = *self.checks.next()?;
            self.pending = self.run(check).into_iter();
        }
    }
}

fn implementation_changes(previous: &ExecutionRecord, current: &ExecutionRecord) -> Vec<Change> {
    let before = &previous.implementation;
    let now = &current.implementation;

    let change = if before.type_name != now.type_name {
        Some(ImplementationChange::TypeChanged {
            previous: before.type_name.clone(),
            current: now.type_name.clone(),
        })
    } else if now.hash.is_none() {
        Some(ImplementationChange::UnknownProvenance {
            type_name: now.type_name.clone(),
        })
    } else if before.hash != now.hash {
        Some(ImplementationChange::CodeChanged {
            type_name: now.type_name.clone(),
        })
    } else {
        None
    };

    change.map(Change::Implementation).into_iter().collect()
}

fn input_value_changes(previous: &ExecutionRecord, current: &ExecutionRecord) -> Vec<Change> {
    let names: BTreeSet<&String> = previous
        .input_properties
        .keys()
        .chain(current.input_properties.keys())
        .collect();

    names
        .into_iter()
        .filter_map(|name| {
            let kind = match (
                previous.input_properties.get(name),
                current.input_properties.get(name),
            ) {
                (None, Some(_)) => ValueChangeKind::Added,
                (Some(_), None) => ValueChangeKind::Removed,
                (Some(_), Some(now)) if !now.is_stable() => ValueChangeKind::Unstable,
                (Some(before), Some(now)) if !now.is_same_as(before) => ValueChangeKind::Modified,
                _ => return None,
            };
            Some(Change::InputValue {
                property_name: name.clone(),
                kind,
            })
        })
        .collect()
}

fn output_file_changes(previous: &ExecutionRecord, current: &ExecutionRecord) -> Vec<Change> {
    // Outputs that were not snapshotted before execution cannot be compared
    let Some(now) = current.output_files.as_ref() else {
        return Vec::new();
    };
    let empty = BTreeMap::new();
    let before = previous.output_files.as_ref().unwrap_or(&empty);

    property_file_changes(before, now)
        .into_iter()
        .map(|(property_name, change)| Change::OutputFile {
            property_name,
            change,
        })
        .collect()
}

/// Per-file changes of every property present on either side, ordered by property name
fn property_file_changes(
    previous: &BTreeMap<String, FileCollectionSnapshot>,
    current: &BTreeMap<String, FileCollectionSnapshot>,
) -> Vec<(String, FileChange)> {
    let empty = FileCollectionSnapshot::empty();
    let names: BTreeSet<&String> = previous.keys().chain(current.keys()).collect();

    names
        .into_iter()
        .flat_map(|name| {
            let before = previous.get(name).unwrap_or(&empty);
            let now = current.get(name).unwrap_or(&empty);
            now.changes_since(before)
                .into_iter()
                .map(move |change| (name.clone(), change))
        })
        .collect()
}
