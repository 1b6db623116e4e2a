use std::env;
use std::path::{Path, PathBuf};

/// XDG base directories used by taskstate
pub struct XdgPaths;

impl XdgPaths {
    /// `$XDG_STATE_HOME/taskstate`, where task history persists between builds.
    ///
    /// A relative `XDG_STATE_HOME` is ignored, as the base directory
    /// specification requires; the fallback is the platform state directory,
    /// then `~/.local/state`.
    pub fn state_dir() -> PathBuf {
        Self::state_home(env::var_os("XDG_STATE_HOME").map(PathBuf::from)).join("taskstate")
    }

    fn state_home(configured: Option<PathBuf>) -> PathBuf {
        configured
            .filter(|dir| dir.is_absolute())
            .or_else(dirs::state_dir)
            .or_else(|| dirs::home_dir().map(|home| home.join(".local/state")))
            .unwrap_or_else(|| Path::new(".local/state").to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_state_dir_honors_xdg_state_home() {
        let original = env::var_os("XDG_STATE_HOME");
        env::set_var("XDG_STATE_HOME", "/tmp/state");

        assert_eq!(XdgPaths::state_dir(), PathBuf::from("/tmp/state/taskstate"));

        match original {
            Some(value) => env::set_var("XDG_STATE_HOME", value),
            None => env::remove_var("XDG_STATE_HOME"),
        }
    }

    #[test]
    fn test_relative_state_home_is_ignored() {
        let home = XdgPaths::state_home(Some(PathBuf::from("relative/state")));
        assert_ne!(home, PathBuf::from("relative/state"));
    }
}
