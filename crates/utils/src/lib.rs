//! Shared utilities for taskstate
//!
//! Small, dependency-light helpers used by the cache and task crates:
//! crash-safe file replacement, XDG directory resolution and tracing setup.

pub mod atomic_file;
pub mod tracing;
pub mod xdg;

pub use atomic_file::*;
pub use xdg::*;
