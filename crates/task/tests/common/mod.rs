#![allow(dead_code)]
//! Shared fixtures for task artifact state integration tests

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use taskstate_cache::{
    CanonicalJsonSnapshotter, ContentHashSnapshotter, FileHistoryStore, HistoryStore,
    StaticFingerprinter,
};
use taskstate_core::{
    Error, FileCollectionSnapshot, FileSet, HashCode, InputValue, Result, SnapshotProvider,
    TaskDescriptor, TaskIdentity,
};
use taskstate_task::TaskArtifactStateRepository;
use tempfile::TempDir;

pub const TASK: &str = ":app:render";
pub const IMPLEMENTATION: &str = "RenderTemplate";

/// Content snapshotter that can be switched to fail every call
pub struct FlakySnapshots {
    inner: ContentHashSnapshotter,
    failing: AtomicBool,
}

impl FlakySnapshots {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            inner: ContentHashSnapshotter::relative_to(base_dir),
            failing: AtomicBool::new(false),
        }
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl SnapshotProvider for FlakySnapshots {
    fn snapshot(&self, files: &FileSet) -> Result<FileCollectionSnapshot> {
        if self.failing.load(Ordering::SeqCst) {
            let path = files.roots().first().cloned().unwrap_or_default();
            return Err(Error::file_system(
                path,
                "read file for snapshot",
                std::io::Error::other("device not ready"),
            ));
        }
        self.inner.snapshot(files)
    }
}

/// A project directory with a persistent history store, shared by several builds
pub struct Project {
    pub dir: TempDir,
    pub store: Arc<FileHistoryStore>,
    pub snapshots: Arc<FlakySnapshots>,
    pub fingerprinter: Arc<StaticFingerprinter>,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileHistoryStore::new(dir.path().join(".history"), true).unwrap());
        let snapshots = Arc::new(FlakySnapshots::new(dir.path()));
        let fingerprinter = Arc::new(
            StaticFingerprinter::new().with(IMPLEMENTATION, HashCode::digest(b"render-v1")),
        );
        fs::write(dir.path().join("template.txt"), "Hello, {name}!").unwrap();
        Self {
            dir,
            store,
            snapshots,
            fingerprinter,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// A repository for a new build invocation
    pub fn build(&self) -> TaskArtifactStateRepository {
        TaskArtifactStateRepository::builder()
            .with_history_store(self.store.clone())
            .with_snapshot_provider(self.snapshots.clone())
            .with_value_snapshotter(Arc::new(CanonicalJsonSnapshotter::new()))
            .with_fingerprinter(self.fingerprinter.clone())
            .build()
            .unwrap()
    }

    /// The render task: one value input, one input file, output `out.bin`
    pub fn task(&self, name: &str) -> TaskDescriptor {
        TaskDescriptor::new(TASK, IMPLEMENTATION)
            .with_input_property("name", InputValue::json(name))
            .with_input_files("template", FileSet::single(self.path("template.txt")))
            .with_output_files("bin", FileSet::single(self.path("out.bin")))
    }

    /// What the render task does when it executes
    pub fn render(&self, name: &str) {
        let template = fs::read_to_string(self.path("template.txt")).unwrap();
        fs::write(self.path("out.bin"), template.replace("{name}", name)).unwrap();
    }

    pub fn has_history(&self) -> bool {
        self.store
            .previous_execution(&TaskIdentity::from(TASK))
            .is_some()
    }
}
