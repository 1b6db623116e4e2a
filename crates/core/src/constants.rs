/// Constants shared across the taskstate workspace

// Environment variable names
pub const TASKSTATE_HISTORY_DIR_VAR: &str = "TASKSTATE_HISTORY_DIR";
pub const TASKSTATE_HISTORY_BACKEND_VAR: &str = "TASKSTATE_HISTORY_BACKEND";

// Directory under the state dir that holds persisted task history
pub const HISTORY_DIR_NAME: &str = "task-history";
