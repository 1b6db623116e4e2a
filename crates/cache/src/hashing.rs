//! Content-hashing snapshot provider
//!
//! Walks every declared root, hashing regular files with streaming SHA-256.
//! Entries are keyed by a normalized, forward-slash path so that the same
//! tree checked out in two different places yields equal snapshots.

use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Component, Path, PathBuf};
use taskstate_core::{
    Error, FileCollectionSnapshot, FileContent, FileSet, HashCode, IoResultExt, Result,
    SnapshotProvider,
};
use walkdir::WalkDir;

const CHUNK_SIZE: usize = 8192;

/// Snapshots file sets by hashing file contents
#[derive(Debug, Clone, Default)]
pub struct ContentHashSnapshotter {
    base_dir: Option<PathBuf>,
}

impl ContentHashSnapshotter {
    /// Normalize every root to its own file name
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Normalize paths below `base_dir` relative to it, typically the project directory
    pub fn relative_to(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Hash a file's content using streaming to handle large files efficiently
    pub fn hash_file(path: &Path) -> Result<HashCode> {
        let file = File::open(path).with_path(path, "open file for hashing")?;
        let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; CHUNK_SIZE];

        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .with_path(path, "read file chunk for hashing")?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(HashCode::from_bytes(hasher.finalize().into()))
    }

    /// Key prefix for every root of one file set.
    ///
    /// Roots below the base directory use their relative path. Other roots use
    /// their shortest trailing path that no other root of the set shares, so
    /// `a/util.h` and `b/util.h` never land on the same key.
    fn root_prefixes(&self, roots: &[PathBuf]) -> Vec<String> {
        let relative: Vec<Option<String>> = roots
            .iter()
            .map(|root| {
                self.base_dir
                    .as_deref()
                    .and_then(|base| root.strip_prefix(base).ok())
                    .map(normalize_relative)
                    .filter(|normalized| !normalized.is_empty())
            })
            .collect();
        let components: Vec<Vec<String>> =
            roots.iter().map(|root| normal_components(root)).collect();
        let mut depth = vec![1usize; roots.len()];

        loop {
            let prefixes: Vec<String> = (0..roots.len())
                .map(|i| match &relative[i] {
                    Some(normalized) => normalized.clone(),
                    None => trailing(&components[i], depth[i]),
                })
                .collect();

            let mut widened = false;
            for i in 0..roots.len() {
                let collides = (0..roots.len())
                    .any(|j| j != i && prefixes[j] == prefixes[i] && roots[j] != roots[i]);
                if collides && relative[i].is_none() && depth[i] < components[i].len() {
                    depth[i] += 1;
                    widened = true;
                }
            }
            if !widened {
                return prefixes;
            }
        }
    }

    fn snapshot_root(
        &self,
        root: &Path,
        prefix: String,
        snapshot: &mut FileCollectionSnapshot,
    ) -> Result<()> {
        match fs::metadata(root) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                snapshot.insert(prefix, root, FileContent::Missing);
                return Ok(());
            }
            Err(e) => return Err(Error::file_system(root, "read metadata", e)),
        }

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                let io = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("file system loop detected"));
                Error::file_system(path, "walk directory", io)
            })?;

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let normalized = join_normalized(&prefix, &normalize_relative(relative));

            let content = if entry.file_type().is_dir() {
                FileContent::Directory
            } else {
                FileContent::RegularFile(Self::hash_file(entry.path())?)
            };
            snapshot.insert(normalized, entry.path(), content);
        }

        Ok(())
    }
}

impl SnapshotProvider for ContentHashSnapshotter {
    fn snapshot(&self, files: &FileSet) -> Result<FileCollectionSnapshot> {
        let mut snapshot = FileCollectionSnapshot::empty();
        let prefixes = self.root_prefixes(files.roots());
        for (root, prefix) in files.roots().iter().zip(prefixes) {
            self.snapshot_root(root, prefix, &mut snapshot)?;
        }
        tracing::debug!(
            roots = files.roots().len(),
            entries = snapshot.len(),
            "snapshotted file set"
        );
        Ok(snapshot)
    }
}

/// Forward-slash form of a relative path with `.` components dropped
fn normalize_relative(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => {
                if parts.last().is_some_and(|last| last != "..") {
                    parts.pop();
                } else {
                    parts.push("..".to_string());
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    parts.join("/")
}

fn normal_components(path: &Path) -> Vec<String> {
    normalize_relative(path)
        .split('/')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// The last `depth` components joined with `/`
fn trailing(components: &[String], depth: usize) -> String {
    components[components.len().saturating_sub(depth)..].join("/")
}

fn join_normalized(prefix: &str, relative: &str) -> String {
    match (prefix.is_empty(), relative.is_empty()) {
        (_, true) => prefix.to_string(),
        (true, false) => relative.to_string(),
        (false, false) => format!("{prefix}/{relative}"),
    }
}
