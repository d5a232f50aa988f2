#![forbid(unsafe_code)]

//! Captures delivered values for later assertions.

use std::sync::Arc;

use parking_lot::Mutex;

/// Shared log of every value handed to [`sink`](Self::sink).
///
/// Clones share the same log.
#[derive(Debug)]
pub struct Recorder<V> {
    values: Arc<Mutex<Vec<V>>>,
}

impl<V> Clone for Recorder<V> {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
        }
    }
}

impl<V> Default for Recorder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Recorder<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    pub fn clear(&self) {
        self.values.lock().clear();
    }
}

impl<V: Clone + Send + 'static> Recorder<V> {
    /// Callback that appends each value it sees.
    pub fn sink(&self) -> impl Fn(&V) + Send + Sync + 'static {
        let values = Arc::clone(&self.values);
        move |value: &V| values.lock().push(value.clone())
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.values.lock().clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<V> {
        self.values.lock().last().cloned()
    }

    /// Return and clear the recorded values.
    pub fn take(&self) -> Vec<V> {
        std::mem::take(&mut *self.values.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_appends_in_order() {
        let rec = Recorder::new();
        let sink = rec.sink();
        sink(&1);
        sink(&2);
        assert_eq!(rec.values(), vec![1, 2]);
        assert_eq!(rec.last(), Some(2));
        assert_eq!(rec.len(), 2);
    }

    #[test]
    fn clones_share_the_log() {
        let rec = Recorder::<String>::new();
        let other = rec.clone();
        (other.sink())(&"a".to_string());
        assert_eq!(rec.take(), vec!["a".to_string()]);
        assert!(rec.is_empty());
        assert!(other.is_empty());
    }

    #[test]
    fn sink_works_across_threads() {
        let rec = Recorder::new();
        let sink = rec.sink();
        std::thread::spawn(move || sink(&7u8)).join().unwrap();
        assert_eq!(rec.values(), vec![7]);
    }
}
