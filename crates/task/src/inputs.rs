//! The view of its inputs handed to a task that is about to execute

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taskstate_core::{FileChange, FileChangeKind};

/// Recorder for input files a task discovers while it executes, such as
/// headers found by scanning sources.
///
/// Cheap to clone; every clone records into the same set.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredInputs {
    files: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl DiscoveredInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_input(&self, path: impl Into<PathBuf>) {
        self.files.lock().insert(path.into());
    }

    pub fn new_inputs(&self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) {
        let mut files = self.files.lock();
        files.extend(paths.into_iter().map(Into::into));
    }

    /// Everything recorded so far
    pub fn files(&self) -> BTreeSet<PathBuf> {
        self.files.lock().clone()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.lock().contains(path)
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }
}

/// A change to one file of a named input file property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFileChange {
    pub property_name: String,
    pub change: FileChange,
}

impl InputFileChange {
    pub fn path(&self) -> &Path {
        &self.change.path
    }

    pub fn kind(&self) -> FileChangeKind {
        self.change.kind
    }

    pub fn is_added(&self) -> bool {
        self.change.kind == FileChangeKind::Added
    }

    pub fn is_modified(&self) -> bool {
        self.change.kind == FileChangeKind::Modified
    }

    pub fn is_removed(&self) -> bool {
        self.change.kind == FileChangeKind::Removed
    }
}

/// How a task that is not up to date may execute
#[derive(Debug, Clone)]
pub enum IncrementalTaskInputs {
    /// Only input files changed; the task may process just these
    ChangesOnly {
        changes: Vec<InputFileChange>,
        discovered: DiscoveredInputs,
    },
    /// The task must redo all of its work; no file-level detail is available
    Rebuild { discovered: DiscoveredInputs },
}

impl IncrementalTaskInputs {
    pub fn is_incremental(&self) -> bool {
        matches!(self, IncrementalTaskInputs::ChangesOnly { .. })
    }

    /// Input file changes, empty for a rebuild
    pub fn changes(&self) -> &[InputFileChange] {
        match self {
            IncrementalTaskInputs::ChangesOnly { changes, .. } => changes,
            IncrementalTaskInputs::Rebuild { .. } => &[],
        }
    }

    /// Added or modified input files
    pub fn out_of_date(&self) -> impl Iterator<Item = &InputFileChange> {
        self.changes().iter().filter(|change| !change.is_removed())
    }

    pub fn removed(&self) -> impl Iterator<Item = &InputFileChange> {
        self.changes().iter().filter(|change| change.is_removed())
    }

    pub fn discovered_inputs(&self) -> &DiscoveredInputs {
        match self {
            IncrementalTaskInputs::ChangesOnly { discovered, .. }
            | IncrementalTaskInputs::Rebuild { discovered } => discovered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_change(path: &str, kind: FileChangeKind) -> InputFileChange {
        InputFileChange {
            property_name: "sources".to_string(),
            change: FileChange {
                path: PathBuf::from(format!("/p/{path}")),
                normalized_path: path.to_string(),
                kind,
            },
        }
    }

    #[test]
    fn test_discovered_inputs_are_shared_between_clones() {
        let discovered = DiscoveredInputs::new();
        let handed_out = discovered.clone();

        handed_out.new_input("/p/include/a.h");
        handed_out.new_inputs(["/p/include/b.h", "/p/include/a.h"]);

        assert_eq!(discovered.files().len(), 2);
        assert!(discovered.contains(Path::new("/p/include/b.h")));
    }

    #[test]
    fn test_changes_only_splits_out_of_date_and_removed() {
        let inputs = IncrementalTaskInputs::ChangesOnly {
            changes: vec![
                input_change("a.c", FileChangeKind::Added),
                input_change("b.c", FileChangeKind::Modified),
                input_change("c.c", FileChangeKind::Removed),
            ],
            discovered: DiscoveredInputs::new(),
        };

        assert!(inputs.is_incremental());
        assert_eq!(inputs.out_of_date().count(), 2);
        let removed: Vec<_> = inputs.removed().map(|c| c.path().to_path_buf()).collect();
        assert_eq!(removed, vec![PathBuf::from("/p/c.c")]);
    }

    #[test]
    fn test_rebuild_carries_no_file_detail() {
        let inputs = IncrementalTaskInputs::Rebuild {
            discovered: DiscoveredInputs::new(),
        };
        assert!(!inputs.is_incremental());
        assert!(inputs.changes().is_empty());
        assert!(inputs.discovered_inputs().is_empty());
    }
}
