//! History store configuration with environment overrides
use crate::history::{FileHistoryStore, HistoryStore, InMemoryHistoryStore};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use taskstate_core::{
    Error, Result, HISTORY_DIR_NAME, TASKSTATE_HISTORY_BACKEND_VAR, TASKSTATE_HISTORY_DIR_VAR,
};
use taskstate_utils::xdg::XdgPaths;

/// Where task history is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    /// Lives as long as the process, useful for tests and one-shot builds
    #[serde(rename = "memory")]
    InMemory,
    #[default]
    File,
}

impl std::str::FromStr for HistoryBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(HistoryBackend::InMemory),
            "file" | "disk" => Ok(HistoryBackend::File),
            other => Err(Error::configuration(format!(
                "unknown history backend '{other}', expected 'memory' or 'file'"
            ))),
        }
    }
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    Default,
    EnvironmentVariable(String),
    /// Set programmatically by the embedding build tool
    Explicit,
}

/// Configuration of the task history store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    pub backend: HistoryBackend,
    /// Directory holding one record file per task, used by the file backend
    pub base_dir: PathBuf,
    /// Reject records whose CRC32C does not match
    pub verify_checksums: bool,
    pub source: ConfigSource,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: HistoryBackend::File,
            base_dir: XdgPaths::state_dir().join(HISTORY_DIR_NAME),
            verify_checksums: true,
            source: ConfigSource::Default,
        }
    }
}

impl HistoryConfig {
    pub fn builder() -> HistoryConfigBuilder {
        HistoryConfigBuilder::new()
    }

    /// Defaults overridden by `TASKSTATE_HISTORY_DIR` and `TASKSTATE_HISTORY_BACKEND`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        let mut overridden = Vec::new();

        if let Ok(dir) = env::var(TASKSTATE_HISTORY_DIR_VAR) {
            if dir.trim().is_empty() {
                return Err(Error::configuration(format!(
                    "{TASKSTATE_HISTORY_DIR_VAR} is set but empty"
                )));
            }
            config.base_dir = PathBuf::from(dir);
            overridden.push(TASKSTATE_HISTORY_DIR_VAR);
        }

        if let Ok(backend) = env::var(TASKSTATE_HISTORY_BACKEND_VAR) {
            config.backend = backend.parse()?;
            overridden.push(TASKSTATE_HISTORY_BACKEND_VAR);
        }

        if !overridden.is_empty() {
            config.source = ConfigSource::EnvironmentVariable(overridden.join(","));
        }

        tracing::debug!(
            backend = ?config.backend,
            base_dir = ?config.base_dir,
            source = ?config.source,
            "resolved history configuration"
        );
        Ok(config)
    }
}

/// Builder for creating history configurations
#[derive(Debug, Default)]
pub struct HistoryConfigBuilder {
    config: HistoryConfig,
}

impl HistoryConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: HistoryConfig::default(),
        }
    }

    pub fn with_backend(mut self, backend: HistoryBackend) -> Self {
        self.config.backend = backend;
        self.config.source = ConfigSource::Explicit;
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.config.base_dir = base_dir.into();
        self.config.source = ConfigSource::Explicit;
        self
    }

    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.config.verify_checksums = verify;
        self
    }

    pub fn build(self) -> HistoryConfig {
        self.config
    }
}

/// Open the history store described by `config`
pub fn open_history_store(config: &HistoryConfig) -> Result<Arc<dyn HistoryStore>> {
    match config.backend {
        HistoryBackend::InMemory => {
            tracing::debug!("using in-memory task history");
            Ok(Arc::new(InMemoryHistoryStore::new()))
        }
        HistoryBackend::File => Ok(Arc::new(FileHistoryStore::new(
            config.base_dir.clone(),
            config.verify_checksums,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use taskstate_core::{BuildInvocationId, ExecutionRecord, TaskIdentity};
    use tempfile::TempDir;

    struct EnvGuard(Vec<(&'static str, Option<String>)>);

    impl EnvGuard {
        fn set(vars: &[(&'static str, Option<&str>)]) -> Self {
            let saved = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();
            for (key, value) in vars {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
            Self(saved)
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.0 {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_history_config_builder() {
        let config = HistoryConfig::builder()
            .with_backend(HistoryBackend::InMemory)
            .with_base_dir("/tmp/history")
            .with_verify_checksums(false)
            .build();

        assert_eq!(config.backend, HistoryBackend::InMemory);
        assert_eq!(config.base_dir, PathBuf::from("/tmp/history"));
        assert!(!config.verify_checksums);
        assert_eq!(config.source, ConfigSource::Explicit);
    }

    #[test]
    fn test_default_base_dir_is_under_state_dir() {
        let config = HistoryConfig::default();
        assert!(config.base_dir.ends_with(HISTORY_DIR_NAME));
        assert_eq!(config.backend, HistoryBackend::File);
        assert!(config.verify_checksums);
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("memory".parse::<HistoryBackend>().unwrap(), HistoryBackend::InMemory);
        assert_eq!(" FILE ".parse::<HistoryBackend>().unwrap(), HistoryBackend::File);
        assert!("redis".parse::<HistoryBackend>().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        let _guard = EnvGuard::set(&[
            (TASKSTATE_HISTORY_DIR_VAR, Some("/var/lib/builds/history")),
            (TASKSTATE_HISTORY_BACKEND_VAR, Some("memory")),
        ]);

        let config = HistoryConfig::from_env().unwrap();
        assert_eq!(config.base_dir, PathBuf::from("/var/lib/builds/history"));
        assert_eq!(config.backend, HistoryBackend::InMemory);
        assert!(matches!(config.source, ConfigSource::EnvironmentVariable(_)));
    }

    #[test]
    #[serial]
    fn test_from_env_without_overrides_is_default() {
        let _guard = EnvGuard::set(&[
            (TASKSTATE_HISTORY_DIR_VAR, None),
            (TASKSTATE_HISTORY_BACKEND_VAR, None),
        ]);

        let config = HistoryConfig::from_env().unwrap();
        assert_eq!(config.source, ConfigSource::Default);
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_unknown_backend() {
        let _guard = EnvGuard::set(&[(TASKSTATE_HISTORY_BACKEND_VAR, Some("tape"))]);
        assert!(HistoryConfig::from_env().is_err());
    }

    #[test]
    fn test_open_file_store() {
        let temp_dir = TempDir::new().unwrap();
        let config = HistoryConfig::builder()
            .with_base_dir(temp_dir.path().join("history"))
            .build();

        let store = open_history_store(&config).unwrap();
        let task = TaskIdentity::from(":lib:jar");
        store
            .update(&task, &ExecutionRecord::new(BuildInvocationId::generate()))
            .unwrap();

        assert!(temp_dir.path().join("history").is_dir());
        assert!(store.previous_execution(&task).is_some());
    }
}
