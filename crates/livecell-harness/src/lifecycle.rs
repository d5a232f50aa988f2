#![forbid(unsafe_code)]

//! A lifecycle owner driven by the test.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use livecell_core::{LifecycleListener, LifecycleOwner, LifecycleState, ListenerId};
use parking_lot::Mutex;
use tracing::trace;

/// Lifecycle owner whose state only changes when the test says so.
///
/// Listeners are invoked synchronously, in registration order, from the
/// thread calling [`move_to`](Self::move_to), with no internal lock held.
pub struct ManualLifecycle {
    name: String,
    state: Mutex<LifecycleState>,
    listeners: Mutex<BTreeMap<ListenerId, LifecycleListener>>,
    next_id: AtomicU64,
    notifications: AtomicU64,
}

impl std::fmt::Debug for ManualLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualLifecycle")
            .field("name", &self.name)
            .field("state", &*self.state.lock())
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

impl ManualLifecycle {
    /// New owner called `name` in `state`.
    pub fn new(name: impl Into<String>, state: LifecycleState) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            state: Mutex::new(state),
            listeners: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            notifications: AtomicU64::new(0),
        })
    }

    /// New owner that is already started.
    pub fn started(name: impl Into<String>) -> Arc<Self> {
        Self::new(name, LifecycleState::Started)
    }

    /// This owner as a trait object, for registration.
    pub fn owner(self: &Arc<Self>) -> Arc<dyn LifecycleOwner> {
        Arc::clone(self) as Arc<dyn LifecycleOwner>
    }

    /// Change state and notify every listener.
    pub fn move_to(&self, state: LifecycleState) {
        *self.state.lock() = state;
        let listeners: Vec<LifecycleListener> = self.listeners.lock().values().cloned().collect();
        trace!(owner = %self.name, %state, listeners = listeners.len(), "lifecycle transition");
        self.notifications.fetch_add(1, Ordering::Relaxed);
        for listener in listeners {
            listener(state);
        }
    }

    /// Change state without telling anyone, leaving cached flags stale.
    pub fn set_silently(&self, state: LifecycleState) {
        *self.state.lock() = state;
    }

    pub fn start(&self) {
        self.move_to(LifecycleState::Started);
    }

    pub fn resume(&self) {
        self.move_to(LifecycleState::Resumed);
    }

    /// Back to `Created`: visible no more, but not destroyed.
    pub fn stop(&self) {
        self.move_to(LifecycleState::Created);
    }

    pub fn destroy(&self) {
        self.move_to(LifecycleState::Destroyed);
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Number of transitions broadcast so far.
    #[must_use]
    pub fn notification_count(&self) -> u64 {
        self.notifications.load(Ordering::Relaxed)
    }
}

impl LifecycleOwner for ManualLifecycle {
    fn current_state(&self) -> LifecycleState {
        *self.state.lock()
    }

    fn add_listener(&self, listener: LifecycleListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().insert(id, listener);
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.lock().remove(&id);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    #[test]
    fn move_to_updates_state_and_notifies() {
        let owner = ManualLifecycle::new("screen", LifecycleState::Created);
        let seen = Arc::new(PlMutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        owner.add_listener(Arc::new(move |s| seen_clone.lock().push(s)));

        owner.start();
        owner.resume();
        owner.stop();
        assert_eq!(owner.current_state(), LifecycleState::Created);
        assert_eq!(
            *seen.lock(),
            vec![
                LifecycleState::Started,
                LifecycleState::Resumed,
                LifecycleState::Created
            ]
        );
        assert_eq!(owner.notification_count(), 3);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let owner = ManualLifecycle::started("screen");
        let hits = Arc::new(AtomicU64::new(0));
        let hits_clone = Arc::clone(&hits);
        let id = owner.add_listener(Arc::new(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(owner.listener_count(), 1);
        owner.remove_listener(id);
        owner.destroy();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(owner.listener_count(), 0);
    }

    #[test]
    fn listener_may_reenter_owner() {
        let owner = ManualLifecycle::new("screen", LifecycleState::Created);
        let weak = Arc::downgrade(&owner);
        owner.add_listener(Arc::new(move |s| {
            // Advance straight to resumed from inside the notification.
            if s == LifecycleState::Started {
                if let Some(owner) = weak.upgrade() {
                    owner.move_to(LifecycleState::Resumed);
                }
            }
        }));
        owner.start();
        assert_eq!(owner.current_state(), LifecycleState::Resumed);
    }

    #[test]
    fn silent_change_skips_listeners() {
        let owner = ManualLifecycle::started("screen");
        owner.set_silently(LifecycleState::Created);
        assert_eq!(owner.current_state(), LifecycleState::Created);
        assert_eq!(owner.notification_count(), 0);
        assert_eq!(owner.owner().name(), "screen");
    }
}
