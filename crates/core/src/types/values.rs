//! Input property values and their snapshots

use serde::{Deserialize, Serialize};

/// Value of a non-file input property as declared by a task
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    /// A plain data value with a deterministic representation
    Json(serde_json::Value),
    /// A value with no stable serialized form, such as a handle or callback
    Opaque { type_name: String },
}

impl InputValue {
    pub fn json(value: impl Into<serde_json::Value>) -> Self {
        InputValue::Json(value.into())
    }

    pub fn opaque(type_name: impl Into<String>) -> Self {
        InputValue::Opaque {
            type_name: type_name.into(),
        }
    }
}

/// Immutable snapshot of one input property value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueSnapshot {
    /// Canonical serialized form of the value
    Captured(Vec<u8>),
    /// The value could not be captured deterministically
    Unstable { reason: String },
}

impl ValueSnapshot {
    pub fn captured(canonical: impl Into<Vec<u8>>) -> Self {
        ValueSnapshot::Captured(canonical.into())
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, ValueSnapshot::Captured(_))
    }

    /// Whether both sides captured the same canonical bytes.
    ///
    /// An unstable snapshot is never the same as anything, itself included.
    pub fn is_same_as(&self, other: &ValueSnapshot) -> bool {
        match (self, other) {
            (ValueSnapshot::Captured(a), ValueSnapshot::Captured(b)) => a == b,
            _ => false,
        }
    }
}
