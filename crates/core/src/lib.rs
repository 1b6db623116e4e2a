//! Core domain types, errors, and collaborator contracts for `taskstate`.
//!
//! This crate holds everything the rest of the workspace agrees on: the
//! execution record that gets persisted between builds, the snapshots it is
//! made of, the classified changes derived from comparing two records, and
//! the traits through which snapshotting and fingerprinting are plugged in.
//!
//! ## Key Components
//!
//! - **`errors`**: the workspace `Error` enum and `Result` alias.
//! - **`types`**: identities, hash codes, snapshots, execution records and
//!   changes.
//! - **`snapshot`**: contracts for the external snapshot provider, value
//!   snapshotter and implementation fingerprinter.
//! - **`constants`**: shared environment variable and directory names.

pub mod constants;
pub mod errors;
pub mod snapshot;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, IoResultExt, Result},
    snapshot::{ImplementationFingerprinter, NotSerializable, SnapshotProvider, ValueSnapshotter},
    types::*,
};
