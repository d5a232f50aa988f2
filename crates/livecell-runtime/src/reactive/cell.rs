#![forbid(unsafe_code)]

//! The versioned value cell and the cross-thread pending slot.
//!
//! # Invariants
//!
//! 1. `version` increments by exactly 1 on every commit, even when the new
//!    value equals the old one. The update event is what counts.
//! 2. `unset()` clears the value without touching the version.
//! 3. The pending slot holds at most one value; a second post before the
//!    drain overwrites the first.

use parking_lot::Mutex;

/// Version a holder built with an initial value starts at.
pub const START_VERSION: Version = 0;

/// Version of an empty holder, and of a delegate that never received a value.
pub const NEVER_DELIVERED: Version = START_VERSION - 1;

/// Monotonic change counter.
pub type Version = i64;

/// Latest value plus its change counter.
#[derive(Debug, Clone)]
pub struct VersionedCell<V> {
    value: Option<V>,
    version: Version,
}

impl<V> VersionedCell<V> {
    /// An unset cell at [`NEVER_DELIVERED`].
    #[must_use]
    pub fn empty() -> Self {
        Self {
            value: None,
            version: NEVER_DELIVERED,
        }
    }

    /// A cell holding `value` at [`START_VERSION`].
    #[must_use]
    pub fn with_value(value: V) -> Self {
        Self {
            value: Some(value),
            version: START_VERSION,
        }
    }

    /// Store `value` and bump the version. Returns the new version.
    pub fn commit(&mut self, value: V) -> Version {
        self.value = Some(value);
        self.version += 1;
        self.version
    }

    /// Drop the value, keep the version.
    pub fn unset(&mut self) {
        self.value = None;
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    #[must_use]
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }
}

/// Single-slot mailbox for values posted from arbitrary threads.
#[derive(Debug)]
pub struct PendingSlot<V> {
    payload: Mutex<Option<V>>,
}

impl<V> Default for PendingSlot<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PendingSlot<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            payload: Mutex::new(None),
        }
    }

    /// Store `value`, replacing anything pending.
    ///
    /// Returns `true` when the slot was empty, i.e. the caller must schedule
    /// the drain.
    pub fn post(&self, value: V) -> bool {
        let mut payload = self.payload.lock();
        let was_empty = payload.is_none();
        *payload = Some(value);
        was_empty
    }

    /// Empty the slot, returning what was pending.
    pub fn take(&self) -> Option<V> {
        self.payload.lock().take()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.lock().is_none()
    }
}
