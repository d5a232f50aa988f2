#![forbid(unsafe_code)]

//! Observer handles with stable identity.
//!
//! Closures have no identity of their own, so an [`Observer`] pairs the
//! callback with an [`ObserverId`] allocated at construction. Clones share the
//! id; that is what the holder keys its registry on.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OBSERVER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an [`Observer`], shared by all of its clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    fn next() -> Self {
        Self(NEXT_OBSERVER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric id, for logging.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

type Callback<V> = Arc<dyn Fn(&V) + Send + Sync>;

/// A value callback registered with a [`LiveData`](super::LiveData).
///
/// Keep a clone around to remove the observer later.
pub struct Observer<V> {
    id: ObserverId,
    callback: Callback<V>,
}

impl<V> Observer<V> {
    /// Wrap `callback` in a new observer with a fresh identity.
    pub fn new(callback: impl Fn(&V) + Send + Sync + 'static) -> Self {
        Self {
            id: ObserverId::next(),
            callback: Arc::new(callback),
        }
    }

    /// This observer's identity.
    #[must_use]
    pub fn id(&self) -> ObserverId {
        self.id
    }

    #[inline]
    pub(crate) fn notify(&self, value: &V) {
        (self.callback)(value);
    }
}

// Manual Clone: `V` itself need not be Clone.
impl<V> Clone for Observer<V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<V> fmt::Debug for Observer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer").field("id", &self.id).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn clones_share_identity() {
        let a = Observer::new(|_: &i32| {});
        let b = a.clone();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn fresh_observers_differ() {
        let a = Observer::new(|_: &i32| {});
        let b = Observer::new(|_: &i32| {});
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn notify_invokes_callback() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        let obs = Observer::new(move |v: &usize| {
            hits_clone.fetch_add(*v, Ordering::SeqCst);
        });
        obs.notify(&3);
        obs.clone().notify(&4);
        assert_eq!(hits.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn display_and_debug() {
        let obs = Observer::new(|_: &()| {});
        let shown = obs.id().to_string();
        assert!(shown.starts_with("observer#"));
        assert!(format!("{obs:?}").contains("Observer"));
    }
}
