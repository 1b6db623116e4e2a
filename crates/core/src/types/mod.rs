//! Core domain types for `taskstate`.
//!
//! ## Organization
//!
//! - **`identity`**: task, implementation and build invocation identifiers
//! - **`hash`**: fixed-size hash codes
//! - **`files`**: file sets and file collection snapshots
//! - **`values`**: input property values and their snapshots
//! - **`execution`**: execution records and task history
//! - **`change`**: classified differences between two execution records
//! - **`task`**: the task description handed to the repository

pub mod change;
pub mod execution;
pub mod files;
pub mod hash;
pub mod identity;
pub mod task;
pub mod values;

pub use change::*;
pub use execution::*;
pub use files::*;
pub use hash::*;
pub use identity::*;
pub use task::*;
pub use values::*;
