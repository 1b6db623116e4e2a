//! Contracts for the collaborators that observe the outside world.
//!
//! The artifact state engine never reads files, serializes values or hashes
//! code itself. It asks these collaborators, which must be deterministic:
//! the same state always yields an equal snapshot, on any machine.

use crate::errors::Result;
use crate::types::{
    FileCollectionSnapshot, FileSet, HashCode, ImplementationIdentity, InputValue, ValueSnapshot,
};

/// Produces comparable snapshots of file sets
pub trait SnapshotProvider: Send + Sync {
    /// Snapshot every file under the roots of `files`.
    ///
    /// Roots that do not exist are recorded as missing. Unreadable files are
    /// an error.
    fn snapshot(&self, files: &FileSet) -> Result<FileCollectionSnapshot>;
}

/// A value that has no deterministic serialized form
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("value of type '{type_name}' cannot be serialized deterministically")]
pub struct NotSerializable {
    pub type_name: String,
}

/// Produces comparable snapshots of input property values
pub trait ValueSnapshotter: Send + Sync {
    fn snapshot(&self, value: &InputValue) -> std::result::Result<ValueSnapshot, NotSerializable>;
}

/// Identifies the code implementing a task
pub trait ImplementationFingerprinter: Send + Sync {
    /// Hash of the implementation, stable for identical code.
    ///
    /// `None` means the provenance of the code is unknown.
    fn fingerprint(&self, implementation: &ImplementationIdentity) -> Option<HashCode>;
}
