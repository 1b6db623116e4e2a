//! Canonical JSON value snapshotter

use serde_json::Value;
use std::collections::BTreeMap;
use taskstate_core::{InputValue, NotSerializable, ValueSnapshot, ValueSnapshotter};

/// Snapshots JSON input values as canonical JSON: object keys sorted, no whitespace
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalJsonSnapshotter;

impl CanonicalJsonSnapshotter {
    pub fn new() -> Self {
        Self
    }
}

impl ValueSnapshotter for CanonicalJsonSnapshotter {
    fn snapshot(&self, value: &InputValue) -> Result<ValueSnapshot, NotSerializable> {
        match value {
            InputValue::Json(json) => {
                let mut out = String::new();
                write_canonical(json, &mut out);
                Ok(ValueSnapshot::captured(out.into_bytes()))
            }
            InputValue::Opaque { type_name } => Err(NotSerializable {
                type_name: type_name.clone(),
            }),
        }
    }
}

/// Canonical JSON text of `value`
pub fn to_canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            out.push_str(&value.to_string())
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (i, (key, item)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
    }
}
