//! Display implementations for error types

use super::types::Error;
use std::fmt;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "file system {} operation failed for '{}': {}",
                    operation,
                    path.display(),
                    source
                )
            }
            Error::Serialization { message, source } => {
                write!(f, "serialization error: {message}: {source}")
            }
            Error::CorruptHistory { path, reason } => {
                write!(f, "corrupt task history at '{}': {}", path.display(), reason)
            }
            Error::ContractViolation { operation, message } => {
                write!(f, "contract violation in '{operation}': {message}")
            }
            Error::NotCacheable { reason } => {
                write!(f, "task is not cacheable: {reason}")
            }
            Error::Configuration { message } => {
                write!(f, "configuration error: {message}")
            }
        }
    }
}
