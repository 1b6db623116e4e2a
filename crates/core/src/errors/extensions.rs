//! Extension traits for error handling

use super::types::{Error, Result};
use std::path::Path;

/// Extension trait attaching path context to I/O results
pub trait IoResultExt<T> {
    /// Convert an I/O error into [`Error::FileSystem`] naming the path and operation
    fn with_path(self, path: &Path, operation: &str) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: &Path, operation: &str) -> Result<T> {
        self.map_err(|e| Error::file_system(path, operation, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_path_keeps_context() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = result
            .with_path(Path::new("/out/app.bin"), "snapshot output")
            .unwrap_err();
        match err {
            Error::FileSystem {
                path, operation, ..
            } => {
                assert_eq!(path, Path::new("/out/app.bin"));
                assert_eq!(operation, "snapshot output");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
