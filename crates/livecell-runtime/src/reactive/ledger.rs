#![forbid(unsafe_code)]

//! Last-delivered versions remembered across observer removal.
//!
//! Keyed observers (see [`LiveData::observe_keyed`](super::LiveData::observe_keyed))
//! write their version back here when they are removed, and start from it
//! when re-registered. A re-created owner therefore does not receive a value
//! its predecessor already consumed.

use std::collections::HashMap;

use super::cell::{NEVER_DELIVERED, Version};

#[derive(Debug, Default, Clone)]
pub struct VersionLedger {
    versions: HashMap<String, Version>,
}

impl VersionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Version last recorded for `key`, or [`NEVER_DELIVERED`].
    #[must_use]
    pub fn recall(&self, key: &str) -> Version {
        self.versions.get(key).copied().unwrap_or(NEVER_DELIVERED)
    }

    pub fn record(&mut self, key: &str, version: Version) {
        self.versions.insert(key.to_owned(), version);
    }

    pub fn forget(&mut self, key: &str) -> Option<Version> {
        self.versions.remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_was_never_delivered() {
        let ledger = VersionLedger::new();
        assert_eq!(ledger.recall("screen"), NEVER_DELIVERED);
        assert!(ledger.is_empty());
    }

    #[test]
    fn record_overwrites() {
        let mut ledger = VersionLedger::new();
        ledger.record("screen", 2);
        ledger.record("screen", 5);
        assert_eq!(ledger.recall("screen"), 5);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.forget("screen"), Some(5));
        assert_eq!(ledger.recall("screen"), NEVER_DELIVERED);
    }
}
