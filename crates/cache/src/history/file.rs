//! History store persisted as one file per task identity

use super::HistoryStore;
use crate::storage::{decode_record, encode_record};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taskstate_core::{Error, ExecutionRecord, HashCode, IoResultExt, Result, TaskIdentity};
use taskstate_utils::atomic_file::write_atomic;

/// History persisted under a directory, one file per task.
///
/// Files are replaced by write-then-rename, so a concurrent reader sees either
/// the old record or the new one. Updates for the same task are serialized by
/// a per-task lock; updates for different tasks proceed independently.
#[derive(Debug)]
pub struct FileHistoryStore {
    base_dir: PathBuf,
    verify_checksums: bool,
    locks: DashMap<TaskIdentity, Arc<Mutex<()>>>,
}

impl FileHistoryStore {
    /// Open (creating if needed) a store rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>, verify_checksums: bool) -> Result<Self> {
        let base_dir = base_dir.into();
        tracing::debug!("Opening task history store at {base_dir:?}");

        fs::create_dir_all(&base_dir).with_path(&base_dir, "create history directory")?;

        Ok(Self {
            base_dir,
            verify_checksums,
            locks: DashMap::new(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File holding the history of `task`
    pub fn record_path(&self, task: &TaskIdentity) -> PathBuf {
        let name = HashCode::digest(task.as_str().as_bytes()).to_hex();
        self.base_dir.join(format!("{name}.bin"))
    }

    fn lock_for(&self, task: &TaskIdentity) -> Arc<Mutex<()>> {
        self.locks
            .entry(task.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    fn read_record(&self, task: &TaskIdentity, path: &Path) -> Result<Option<ExecutionRecord>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::file_system(path, "read task history", e)),
        };

        let persisted = decode_record(path, &bytes, self.verify_checksums)?;
        if &persisted.task != task {
            return Err(Error::corrupt_history(
                path,
                format!("record belongs to '{}', not '{}'", persisted.task, task),
            ));
        }
        Ok(Some(persisted.record))
    }
}

impl HistoryStore for FileHistoryStore {
    fn previous_execution(&self, task: &TaskIdentity) -> Option<ExecutionRecord> {
        let path = self.record_path(task);
        match self.read_record(task, &path) {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                tracing::debug!(task = %task, "no task history found");
                None
            }
            Err(e) => {
                tracing::warn!(task = %task, "discarding unusable task history: {e}");
                None
            }
        }
    }

    fn update(&self, task: &TaskIdentity, record: &ExecutionRecord) -> Result<()> {
        let lock = self.lock_for(task);
        let _guard = lock.lock();

        let path = self.record_path(task);
        let bytes = encode_record(task, record)?;
        write_atomic(&path, &bytes)?;

        tracing::debug!(task = %task, path = ?path, bytes = bytes.len(), "persisted task history");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use taskstate_core::{BuildInvocationId, ImplementationSnapshot, ValueSnapshot};
    use tempfile::TempDir;

    fn record(value: &[u8]) -> ExecutionRecord {
        let mut record = ExecutionRecord::new(BuildInvocationId::generate());
        record.implementation = ImplementationSnapshot::new("Copy", Some(HashCode::digest(b"copy")));
        record
            .input_properties
            .insert("value".to_string(), ValueSnapshot::captured(value.to_vec()));
        record
    }

    #[test]
    fn test_update_then_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileHistoryStore::new(temp_dir.path(), true).unwrap();
        let task = TaskIdentity::from(":app:copy");
        let written = record(b"1");

        store.update(&task, &written).unwrap();

        assert_eq!(store.previous_execution(&task), Some(written));
        assert!(store.record_path(&task).exists());
    }

    #[test]
    fn test_history_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let task = TaskIdentity::from(":app:copy");
        let written = record(b"1");
        FileHistoryStore::new(temp_dir.path(), true)
            .unwrap()
            .update(&task, &written)
            .unwrap();

        let reopened = FileHistoryStore::new(temp_dir.path(), true).unwrap();
        assert_eq!(reopened.previous_execution(&task), Some(written));
    }

    #[test]
    fn test_corrupt_history_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileHistoryStore::new(temp_dir.path(), true).unwrap();
        let task = TaskIdentity::from(":app:copy");
        fs::write(store.record_path(&task), b"definitely not a history record").unwrap();

        assert!(store.previous_execution(&task).is_none());

        // A corrupt record does not block writing a fresh one
        store.update(&task, &record(b"2")).unwrap();
        assert!(store.previous_execution(&task).is_some());
    }

    #[test]
    fn test_record_for_other_identity_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileHistoryStore::new(temp_dir.path(), true).unwrap();
        let a = TaskIdentity::from(":a");
        let b = TaskIdentity::from(":b");
        store.update(&a, &record(b"a")).unwrap();
        fs::copy(store.record_path(&a), store.record_path(&b)).unwrap();

        assert!(store.previous_execution(&b).is_none());
    }

    #[test]
    fn test_failed_update_is_reported_and_leaves_other_records_alone() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileHistoryStore::new(temp_dir.path(), true).unwrap();
        let blocked = TaskIdentity::from(":blocked");
        let other = TaskIdentity::from(":other");
        let other_record = record(b"other");
        store.update(&other, &other_record).unwrap();

        // A non-empty directory at the record path makes the final rename fail
        let path = store.record_path(&blocked);
        fs::create_dir(&path).unwrap();
        fs::write(path.join("blocker"), b"x").unwrap();

        assert!(store.update(&blocked, &record(b"new")).is_err());
        assert!(path.join("blocker").exists());
        assert_eq!(store.previous_execution(&other), Some(other_record));
        assert!(store.previous_execution(&blocked).is_none());
    }

    #[test]
    fn test_concurrent_updates_same_task_leave_a_complete_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FileHistoryStore::new(temp_dir.path(), true).unwrap());
        let task = TaskIdentity::from(":shared");
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                let task = task.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for j in 0..10u8 {
                        store.update(&task, &record(&[i, j])).unwrap();
                        assert!(store.previous_execution(&task).is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(store.previous_execution(&task).is_some());
    }
}
