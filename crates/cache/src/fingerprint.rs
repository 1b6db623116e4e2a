//! Registry-backed implementation fingerprinter

use dashmap::DashMap;
use taskstate_core::{HashCode, ImplementationFingerprinter, ImplementationIdentity};

/// Fingerprints implementations from a registry filled in by the embedding tool.
///
/// Identities that were never registered have unknown provenance.
#[derive(Debug, Default)]
pub struct StaticFingerprinter {
    hashes: DashMap<ImplementationIdentity, HashCode>,
}

impl StaticFingerprinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hash` for `implementation`, replacing any earlier registration
    pub fn register(&self, implementation: impl Into<ImplementationIdentity>, hash: HashCode) {
        self.hashes.insert(implementation.into(), hash);
    }

    /// Register the SHA-256 of `source` for `implementation`
    pub fn register_source(&self, implementation: impl Into<ImplementationIdentity>, source: &[u8]) {
        self.register(implementation, HashCode::digest(source));
    }

    pub fn with(self, implementation: impl Into<ImplementationIdentity>, hash: HashCode) -> Self {
        self.register(implementation, hash);
        self
    }
}

impl ImplementationFingerprinter for StaticFingerprinter {
    fn fingerprint(&self, implementation: &ImplementationIdentity) -> Option<HashCode> {
        let hash = self.hashes.get(implementation).map(|entry| *entry.value());
        if hash.is_none() {
            tracing::debug!(implementation = %implementation, "no fingerprint registered");
        }
        hash
    }
}
