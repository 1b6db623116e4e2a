//! Cache keys, execution history and reference collaborators for taskstate
//!
//! This crate provides the persistence side of the artifact state engine:
//! - Deterministic cache keys derived from execution records
//! - History stores (in-memory and file-backed) keyed by task identity
//! - A versioned, checksummed on-disk record format
//! - Content-hashing, canonical-JSON and registry-backed collaborators

pub mod config;
pub mod fingerprint;
pub mod hashing;
pub mod history;
pub mod keys;
pub mod storage;
pub mod values;

pub use config::{
    open_history_store, ConfigSource, HistoryBackend, HistoryConfig, HistoryConfigBuilder,
};
pub use fingerprint::StaticFingerprinter;
pub use hashing::ContentHashSnapshotter;
pub use history::{FileHistoryStore, HistoryStore, InMemoryHistoryStore};
pub use keys::{CacheKey, CacheKeyCalculator};
pub use values::{to_canonical_json, CanonicalJsonSnapshotter};
