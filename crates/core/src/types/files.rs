//! File sets and the snapshots taken of them

use crate::types::hash::HashCode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// The declared roots of one named input or output property
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet {
    roots: Vec<PathBuf>,
}

impl FileSet {
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn single(root: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![root.into()],
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// What a snapshot observed at one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileContent {
    RegularFile(HashCode),
    Directory,
    Missing,
}

/// One entry of a [`FileCollectionSnapshot`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Location on disk when the snapshot was taken
    pub path: PathBuf,
    pub content: FileContent,
}

/// How a single file differs between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileChangeKind {
    Added,
    Modified,
    Removed,
}

impl fmt::Display for FileChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            FileChangeKind::Added => "added",
            FileChangeKind::Modified => "changed",
            FileChangeKind::Removed => "removed",
        };
        f.write_str(verb)
    }
}

/// A single file that differs between two snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub normalized_path: String,
    pub kind: FileChangeKind,
}

/// Immutable, comparable snapshot of a [`FileSet`].
///
/// Entries are keyed by normalized path, so iteration order, equality and
/// diffing never depend on the order in which the snapshot provider visited
/// the file system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCollectionSnapshot {
    entries: BTreeMap<String, FileEntry>,
}

impl FileCollectionSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Record `content` for `path` under `normalized_path`, replacing any previous entry
    pub fn insert(
        &mut self,
        normalized_path: impl Into<String>,
        path: impl Into<PathBuf>,
        content: FileContent,
    ) {
        self.entries.insert(
            normalized_path.into(),
            FileEntry {
                path: path.into(),
                content,
            },
        );
    }

    pub fn get(&self, normalized_path: &str) -> Option<&FileEntry> {
        self.entries.get(normalized_path)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &FileEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths of everything that existed when the snapshot was taken
    pub fn files(&self) -> BTreeSet<PathBuf> {
        self.entries
            .values()
            .filter(|entry| entry.content != FileContent::Missing)
            .map(|entry| entry.path.clone())
            .collect()
    }

    /// Per-file differences of `self` relative to `previous`, ordered by normalized path.
    ///
    /// A path recorded as missing on one side and absent on the other is not a change.
    pub fn changes_since(&self, previous: &FileCollectionSnapshot) -> Vec<FileChange> {
        let mut changes = Vec::new();
        let mut current = self.entries.iter().peekable();
        let mut before = previous.entries.iter().peekable();

        loop {
            let ordering = match (current.peek(), before.peek()) {
                (None, None) => break,
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (Some((c, _)), Some((b, _))) => c.cmp(b),
            };

            match ordering {
                std::cmp::Ordering::Less => {
                    if let Some((key, entry)) = current.next() {
                        if entry.content != FileContent::Missing {
                            changes.push(change(key, &entry.path, FileChangeKind::Added));
                        }
                    }
                }
                std::cmp::Ordering::Greater => {
                    if let Some((key, entry)) = before.next() {
                        if entry.content != FileContent::Missing {
                            changes.push(change(key, &entry.path, FileChangeKind::Removed));
                        }
                    }
                }
                std::cmp::Ordering::Equal => {
                    if let (Some((key, now)), Some((_, then))) = (current.next(), before.next()) {
                        match (then.content, now.content) {
                            (a, b) if a == b => {}
                            (FileContent::Missing, _) => {
                                changes.push(change(key, &now.path, FileChangeKind::Added))
                            }
                            (_, FileContent::Missing) => {
                                changes.push(change(key, &then.path, FileChangeKind::Removed))
                            }
                            _ => changes.push(change(key, &now.path, FileChangeKind::Modified)),
                        }
                    }
                }
            }
        }

        changes
    }
}

fn change(normalized_path: &str, path: &Path, kind: FileChangeKind) -> FileChange {
    FileChange {
        path: path.to_path_buf(),
        normalized_path: normalized_path.to_string(),
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content: &[u8]) -> FileContent {
        FileContent::RegularFile(HashCode::digest(content))
    }

    #[test]
    fn test_identical_snapshots_have_no_changes() {
        let mut a = FileCollectionSnapshot::empty();
        a.insert("src/a.rs", "/p/src/a.rs", file(b"a"));
        a.insert("src", "/p/src", FileContent::Directory);
        let b = a.clone();
        assert!(a.changes_since(&b).is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_changes_are_classified_and_ordered() {
        let mut before = FileCollectionSnapshot::empty();
        before.insert("a.txt", "/p/a.txt", file(b"a"));
        before.insert("b.txt", "/p/b.txt", file(b"b"));
        before.insert("d.txt", "/p/d.txt", file(b"d"));

        let mut now = FileCollectionSnapshot::empty();
        now.insert("a.txt", "/p/a.txt", file(b"a"));
        now.insert("b.txt", "/p/b.txt", file(b"b2"));
        now.insert("c.txt", "/p/c.txt", file(b"c"));

        let changes = now.changes_since(&before);
        let summary: Vec<_> = changes
            .iter()
            .map(|c| (c.normalized_path.as_str(), c.kind))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("b.txt", FileChangeKind::Modified),
                ("c.txt", FileChangeKind::Added),
                ("d.txt", FileChangeKind::Removed),
            ]
        );
    }

    #[test]
    fn test_missing_entries_compare_as_absent() {
        let mut before = FileCollectionSnapshot::empty();
        before.insert("out.bin", "/p/out.bin", FileContent::Missing);
        let now = FileCollectionSnapshot::empty();
        assert!(now.changes_since(&before).is_empty());

        let mut created = FileCollectionSnapshot::empty();
        created.insert("out.bin", "/p/out.bin", file(b"x"));
        let changes = created.changes_since(&before);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, FileChangeKind::Added);

        let removed = before.changes_since(&created);
        assert_eq!(removed[0].kind, FileChangeKind::Removed);
    }

    #[test]
    fn test_files_skips_missing_entries() {
        let mut snapshot = FileCollectionSnapshot::empty();
        snapshot.insert("a", "/p/a", file(b"a"));
        snapshot.insert("gone", "/p/gone", FileContent::Missing);
        let files = snapshot.files();
        assert_eq!(files.len(), 1);
        assert!(files.contains(Path::new("/p/a")));
    }
}
