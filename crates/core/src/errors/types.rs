//! Core error type definitions

use std::path::PathBuf;

/// Result type alias for taskstate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for taskstate operations using thiserror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File system operations, including snapshot I/O
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Encoding or decoding of persisted state
    Serialization {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Persisted history that failed validation
    CorruptHistory { path: PathBuf, reason: String },

    /// A session operation was called out of order
    ContractViolation {
        operation: &'static str,
        message: String,
    },

    /// The execution record cannot produce a deterministic cache key
    NotCacheable { reason: String },

    /// Configuration errors
    Configuration { message: String },
}
