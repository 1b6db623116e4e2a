//! Cache key calculation for task execution records
//!
//! The key is a SHA-256 digest over a canonical encoding of the parts of an
//! [`ExecutionRecord`] that determine its outputs. Every field is tagged and
//! length-prefixed, and every collection is visited in sorted order, so the
//! key only depends on the recorded state and never on the process, machine
//! or insertion order that produced it.

use sha2::{Digest, Sha256};
use std::fmt;
use taskstate_core::{Error, ExecutionRecord, FileContent, HashCode, Result, ValueSnapshot};

/// Bumped whenever the canonical encoding below changes
const CACHE_KEY_VERSION: u32 = 1;

/// Deterministic digest identifying an execution's reproducible result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(HashCode);

impl CacheKey {
    pub fn hash_code(&self) -> &HashCode {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Computes [`CacheKey`]s from execution records
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeyCalculator;

impl CacheKeyCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Derive the cache key of `record`.
    ///
    /// Returns [`Error::NotCacheable`] when the implementation provenance is
    /// unknown or an input value could not be captured deterministically.
    pub fn calculate(&self, record: &ExecutionRecord) -> Result<CacheKey> {
        let mut hasher = KeyHasher::new();
        hasher.put_u32(CACHE_KEY_VERSION);

        let implementation = &record.implementation;
        let implementation_hash = implementation.hash.ok_or_else(|| {
            Error::not_cacheable(format!(
                "task implementation '{}' was loaded from an unknown location",
                implementation.type_name
            ))
        })?;
        hasher.put_tag("implementation");
        hasher.put_str(&implementation.type_name);
        hasher.put_bytes(implementation_hash.as_bytes());

        hasher.put_tag("input-properties");
        hasher.put_len(record.input_properties.len());
        for (name, snapshot) in &record.input_properties {
            match snapshot {
                ValueSnapshot::Captured(canonical) => {
                    hasher.put_str(name);
                    hasher.put_bytes(canonical);
                }
                ValueSnapshot::Unstable { reason } => {
                    return Err(Error::not_cacheable(format!(
                        "value of input property '{name}' cannot be captured deterministically: {reason}"
                    )));
                }
            }
        }

        hasher.put_tag("input-files");
        hasher.put_len(record.input_files.len());
        for (property_name, snapshot) in &record.input_files {
            hasher.put_str(property_name);
            hasher.put_len(snapshot.len());
            for (normalized_path, entry) in snapshot.entries() {
                hasher.put_str(normalized_path);
                match entry.content {
                    FileContent::Missing => hasher.put_u8(0),
                    FileContent::RegularFile(hash) => {
                        hasher.put_u8(1);
                        hasher.put_bytes(hash.as_bytes());
                    }
                    FileContent::Directory => hasher.put_u8(2),
                }
            }
        }

        hasher.put_tag("output-properties");
        hasher.put_len(record.output_property_names.len());
        for name in &record.output_property_names {
            hasher.put_str(name);
        }

        let key = CacheKey(hasher.finish());
        tracing::debug!(cache_key = %key, "calculated cache key");
        Ok(key)
    }
}

/// SHA-256 over length-prefixed fields
struct KeyHasher {
    hasher: Sha256,
}

impl KeyHasher {
    fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    fn put_tag(&mut self, tag: &'static str) {
        self.put_str(tag);
    }

    fn put_str(&mut self, value: &str) {
        self.put_bytes(value.as_bytes());
    }

    fn put_bytes(&mut self, bytes: &[u8]) {
        self.put_len(bytes.len());
        self.hasher.update(bytes);
    }

    fn put_len(&mut self, len: usize) {
        self.hasher.update((len as u64).to_le_bytes());
    }

    fn put_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    fn put_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    fn finish(self) -> HashCode {
        HashCode::from_bytes(self.hasher.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::{BTreeMap, BTreeSet};
    use taskstate_core::{BuildInvocationId, FileCollectionSnapshot, ImplementationSnapshot};

    fn record(values: &BTreeMap<String, Vec<u8>>, files: &[(&str, &[u8])]) -> ExecutionRecord {
        let mut record = ExecutionRecord::new(BuildInvocationId::generate());
        record.implementation =
            ImplementationSnapshot::new("CompileTask", Some(HashCode::digest(b"impl-v1")));
        record.input_properties = values
            .iter()
            .map(|(k, v)| (k.clone(), ValueSnapshot::captured(v.clone())))
            .collect();
        let mut sources = FileCollectionSnapshot::empty();
        for (path, content) in files {
            sources.insert(
                *path,
                format!("/machine-specific/{path}"),
                FileContent::RegularFile(HashCode::digest(content)),
            );
        }
        record.input_files.insert("sources".to_string(), sources);
        record.output_property_names = BTreeSet::from(["classes".to_string()]);
        record
    }

    fn values(pairs: &[(&str, &[u8])]) -> BTreeMap<String, Vec<u8>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect()
    }

    #[test]
    fn test_key_ignores_build_id_and_absolute_paths() {
        let calculator = CacheKeyCalculator::new();
        let v = values(&[("target", b"\"17\"")]);
        let a = record(&v, &[("src/main.rs", b"fn main() {}")]);
        let mut b = record(&v, &[("src/main.rs", b"fn main() {}")]);
        for snapshot in b.input_files.values_mut() {
            let mut moved = FileCollectionSnapshot::empty();
            for (normalized, entry) in snapshot.entries() {
                moved.insert(normalized, format!("/other-machine/{normalized}"), entry.content);
            }
            *snapshot = moved;
        }
        assert_ne!(a.build_invocation_id, b.build_invocation_id);
        assert_eq!(
            calculator.calculate(&a).unwrap(),
            calculator.calculate(&b).unwrap()
        );
    }

    #[test]
    fn test_key_changes_with_each_component() {
        let calculator = CacheKeyCalculator::new();
        let v = values(&[("target", b"\"17\"")]);
        let base = record(&v, &[("src/main.rs", b"fn main() {}")]);
        let base_key = calculator.calculate(&base).unwrap();

        let mut changed_impl = base.clone();
        changed_impl.implementation.hash = Some(HashCode::digest(b"impl-v2"));
        assert_ne!(calculator.calculate(&changed_impl).unwrap(), base_key);

        let changed_file = record(&v, &[("src/main.rs", b"fn main() { run() }")]);
        assert_ne!(calculator.calculate(&changed_file).unwrap(), base_key);

        let mut changed_outputs = base.clone();
        changed_outputs.output_property_names.insert("headers".to_string());
        assert_ne!(calculator.calculate(&changed_outputs).unwrap(), base_key);
    }

    #[test]
    fn test_field_boundaries_are_unambiguous() {
        let calculator = CacheKeyCalculator::new();
        let a = record(&values(&[("ab", b"c")]), &[]);
        let b = record(&values(&[("a", b"bc")]), &[]);
        assert_ne!(
            calculator.calculate(&a).unwrap(),
            calculator.calculate(&b).unwrap()
        );
    }

    #[test]
    fn test_unstable_value_is_not_cacheable() {
        let calculator = CacheKeyCalculator::new();
        let mut r = record(&values(&[("target", b"\"17\"")]), &[]);
        r.input_properties.insert(
            "callback".to_string(),
            ValueSnapshot::Unstable {
                reason: "closure".to_string(),
            },
        );
        let err = calculator.calculate(&r).unwrap_err();
        assert!(err.is_not_cacheable());
        assert!(err.to_string().contains("callback"));
    }

    #[test]
    fn test_unknown_implementation_is_not_cacheable() {
        let calculator = CacheKeyCalculator::new();
        let mut r = record(&values(&[]), &[]);
        r.implementation.hash = None;
        assert!(calculator.calculate(&r).unwrap_err().is_not_cacheable());
    }

    proptest! {
        #[test]
        fn prop_independently_built_records_share_a_key(
            props in proptest::collection::btree_map("[a-z]{1,8}", proptest::collection::vec(any::<u8>(), 0..16), 0..6)
        ) {
            let calculator = CacheKeyCalculator::new();
            let a = record(&props, &[("a.txt", b"a")]);
            // Insert in reverse order to rule out insertion-order effects
            let mut b = record(&BTreeMap::new(), &[("a.txt", b"a")]);
            for (k, v) in props.iter().rev() {
                b.input_properties.insert(k.clone(), ValueSnapshot::captured(v.clone()));
            }
            prop_assert_eq!(calculator.calculate(&a).unwrap(), calculator.calculate(&b).unwrap());
        }

        #[test]
        fn prop_changing_one_value_changes_the_key(
            props in proptest::collection::btree_map("[a-z]{1,8}", proptest::collection::vec(any::<u8>(), 0..16), 1..6),
            extra in any::<u8>()
        ) {
            let calculator = CacheKeyCalculator::new();
            let original = record(&props, &[]);
            let mut changed_props = props.clone();
            if let Some(value) = changed_props.values_mut().next() {
                value.push(extra);
            }
            let changed = record(&changed_props, &[]);
            prop_assert_ne!(calculator.calculate(&original).unwrap(), calculator.calculate(&changed).unwrap());
        }
    }
}
