//! Builder methods for creating errors with context

use super::types::Error;
use std::path::PathBuf;

impl Error {
    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a serialization error wrapping the codec failure
    #[must_use]
    pub fn serialization(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Create a corrupt history error
    #[must_use]
    pub fn corrupt_history(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptHistory {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a contract violation error
    #[must_use]
    pub fn contract_violation(operation: &'static str, message: impl Into<String>) -> Self {
        Error::ContractViolation {
            operation,
            message: message.into(),
        }
    }

    /// Create a not-cacheable error
    #[must_use]
    pub fn not_cacheable(reason: impl Into<String>) -> Self {
        Error::NotCacheable {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Whether the error signals a programming mistake in the caller.
    ///
    /// Fatal errors abort processing of the current task and must not be
    /// treated as an ordinary task failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ContractViolation { .. })
    }

    /// Whether the error only means the task cannot use the build cache
    pub fn is_not_cacheable(&self) -> bool {
        matches!(self, Error::NotCacheable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let violation = Error::contract_violation("select_incremental_inputs", "not evaluated");
        assert!(violation.is_fatal());
        assert!(!violation.is_not_cacheable());

        let not_cacheable = Error::not_cacheable("input property 'x' is unstable");
        assert!(!not_cacheable.is_fatal());
        assert!(not_cacheable.is_not_cacheable());

        let io = Error::file_system(
            "/tmp/missing",
            "read",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(!io.is_fatal());
    }

    #[test]
    fn test_display_messages() {
        let err = Error::contract_violation("finalize", "session was never evaluated");
        assert_eq!(
            err.to_string(),
            "contract violation in 'finalize': session was never evaluated"
        );

        let err = Error::corrupt_history("/state/abc.bin", "bad magic");
        assert_eq!(
            err.to_string(),
            "corrupt task history at '/state/abc.bin': bad magic"
        );
    }
}
