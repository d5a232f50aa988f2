#![forbid(unsafe_code)]

//! Insertion-ordered observer registry with mutation-tolerant iteration.
//!
//! # Design
//!
//! Every insertion is stamped with a monotonically increasing sequence
//! number. Entries live in a `BTreeMap` keyed by that number, with a side
//! index from key to sequence. Iteration is driven by a [`Cursor`] that only
//! remembers the last sequence it visited, so:
//!
//! - entries inserted during iteration have larger sequence numbers and are
//!   visited by the same cursor;
//! - entries removed during iteration simply stop being found;
//! - the cursor borrows nothing between steps, so the registry can be
//!   mutated (from observer callbacks) while a sweep is in progress.
//!
//! | Operation         | Complexity |
//! |-------------------|------------|
//! | `put_if_absent`   | O(log n)   |
//! | `remove`          | O(log n)   |
//! | `get` / `get_mut` | O(log n)   |
//! | `Cursor::next`    | O(log n)   |

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::ops::Bound;

/// Ordered map from key to entry, safe to mutate between cursor steps.
#[derive(Debug)]
pub struct ObserverRegistry<K, D> {
    entries: BTreeMap<u64, (K, D)>,
    index: HashMap<K, u64>,
    next_seq: u64,
}

impl<K, D> Default for ObserverRegistry<K, D> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<K: Copy + Eq + Hash, D> ObserverRegistry<K, D> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` unless `key` is present.
    ///
    /// Returns the existing entry if there was one; `value` is dropped in
    /// that case.
    pub fn put_if_absent(&mut self, key: K, value: D) -> Option<&D> {
        if self.index.contains_key(&key) {
            return self.get(&key);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(key, seq);
        self.entries.insert(seq, (key, value));
        None
    }

    /// Remove and return the entry for `key`.
    pub fn remove(&mut self, key: &K) -> Option<D> {
        let seq = self.index.remove(key)?;
        self.entries.remove(&seq).map(|(_, d)| d)
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<&D> {
        let seq = self.index.get(key)?;
        self.entries.get(seq).map(|(_, d)| d)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut D> {
        let seq = self.index.get(key)?;
        self.entries.get_mut(seq).map(|(_, d)| d)
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Borrowing iteration in insertion order. Not for use across callbacks.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &D)> {
        self.entries.values().map(|(k, d)| (k, d))
    }

    /// Keys of all entries matching `pred`, in insertion order.
    pub fn keys_where(&self, mut pred: impl FnMut(&D) -> bool) -> Vec<K> {
        self.entries
            .values()
            .filter(|(_, d)| pred(d))
            .map(|(k, _)| *k)
            .collect()
    }

    fn next_after(&self, after: Option<u64>) -> Option<(u64, K)> {
        let lower = match after {
            Some(seq) => Bound::Excluded(seq),
            None => Bound::Unbounded,
        };
        self.entries
            .range((lower, Bound::Unbounded))
            .next()
            .map(|(seq, (k, _))| (*seq, *k))
    }
}

/// Detached iteration position over an [`ObserverRegistry`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    after: Option<u64>,
}

impl Cursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next live entry and return its key.
    pub fn next<K: Copy + Eq + Hash, D>(&mut self, registry: &ObserverRegistry<K, D>) -> Option<K> {
        let (seq, key) = registry.next_after(self.after)?;
        self.after = Some(seq);
        Some(key)
    }
}
