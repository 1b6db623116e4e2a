//! Newtype wrappers for the identities tracked across builds

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::Deref;
use uuid::Uuid;

/// Stable key identifying a unit of work across builds, such as `:app:compile`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskIdentity(String);

impl TaskIdentity {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TaskIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for TaskIdentity {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for TaskIdentity {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskIdentity {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Name of the code implementing a task, handed to the fingerprinter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImplementationIdentity(String);

impl ImplementationIdentity {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self(type_name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ImplementationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ImplementationIdentity {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of one build invocation, recorded on every persisted execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildInvocationId(Uuid);

impl BuildInvocationId {
    /// Generate a fresh identifier for a new build
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Display for BuildInvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
