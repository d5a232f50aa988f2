#![forbid(unsafe_code)]

//! Per-observer bookkeeping.
//!
//! A [`ClientDelegate`] tracks one observer's cached active flag, the last
//! version it was handed, and its options. The part of a delegate that talks
//! to the outside world (its lifecycle owner) is split out as a
//! [`ClientSource`], a cheap clone the holder can use after releasing its
//! registry lock. Owners call back into the holder synchronously, so they
//! must never be invoked while that lock is held.
//!
//! | Variant        | Eligible when        | Owner listener | Swept by owner |
//! |----------------|----------------------|----------------|----------------|
//! | Lifecycle      | owner ≥ `Started`    | yes            | yes            |
//! | Always-active  | always               | no             | never          |

use std::sync::Arc;

use livecell_core::{LifecycleListener, LifecycleOwner, ListenerId, same_owner};

use super::cell::{NEVER_DELIVERED, Version};
use super::observer::Observer;
use super::options::ObserveOptions;

/// The external side of a delegate.
#[derive(Clone)]
pub enum ClientSource {
    Lifecycle(Arc<dyn LifecycleOwner>),
    AlwaysActive,
}

impl ClientSource {
    /// Start listening to the owner. `None` for the always-active variant.
    pub fn observe_source(&self, listener: LifecycleListener) -> Option<ListenerId> {
        match self {
            Self::Lifecycle(owner) => Some(owner.add_listener(listener)),
            Self::AlwaysActive => None,
        }
    }

    pub fn stop_observing(&self, listener: Option<ListenerId>) {
        if let (Self::Lifecycle(owner), Some(id)) = (self, listener) {
            owner.remove_listener(id);
        }
    }

    /// Ask the authoritative source whether the observer may receive values.
    #[must_use]
    pub fn is_currently_eligible(&self) -> bool {
        match self {
            Self::Lifecycle(owner) => owner.current_state().is_active(),
            Self::AlwaysActive => true,
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Lifecycle(owner) => owner.name().to_owned(),
            Self::AlwaysActive => "always-active".to_owned(),
        }
    }
}

impl std::fmt::Debug for ClientSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lifecycle(owner) => f.debug_tuple("Lifecycle").field(&owner.name()).finish(),
            Self::AlwaysActive => f.write_str("AlwaysActive"),
        }
    }
}

pub struct ClientDelegate<V> {
    observer: Observer<V>,
    source: ClientSource,
    options: ObserveOptions,
    listener: Option<ListenerId>,
    resume_key: Option<String>,
    active: bool,
    last_version: Version,
}

impl<V> ClientDelegate<V> {
    /// Delegate bound to `owner`'s lifecycle.
    pub fn lifecycle(
        owner: Arc<dyn LifecycleOwner>,
        options: ObserveOptions,
        observer: Observer<V>,
    ) -> Self {
        Self::with_source(ClientSource::Lifecycle(owner), options, observer)
    }

    /// Delegate that is active until explicitly removed.
    pub fn always_active(options: ObserveOptions, observer: Observer<V>) -> Self {
        Self::with_source(ClientSource::AlwaysActive, options, observer)
    }

    fn with_source(source: ClientSource, options: ObserveOptions, observer: Observer<V>) -> Self {
        Self {
            observer,
            source,
            options,
            listener: None,
            resume_key: None,
            active: false,
            last_version: NEVER_DELIVERED,
        }
    }

    /// Resume from a previously recorded version under `key`.
    #[must_use]
    pub fn resuming(mut self, key: String, last_version: Version) -> Self {
        self.resume_key = Some(key);
        self.last_version = last_version;
        self
    }

    /// Compare-and-set the active flag. Returns `true` only on a real change.
    pub fn set_active(&mut self, active: bool) -> bool {
        if self.active == active {
            return false;
        }
        self.active = active;
        true
    }

    /// True if this delegate is bound to `owner`.
    #[must_use]
    pub fn associated_with(&self, owner: &Arc<dyn LifecycleOwner>) -> bool {
        match &self.source {
            ClientSource::Lifecycle(mine) => same_owner(mine, owner),
            ClientSource::AlwaysActive => false,
        }
    }

    #[must_use]
    pub fn is_lifecycle_bound(&self) -> bool {
        matches!(self.source, ClientSource::Lifecycle(_))
    }

    #[must_use]
    pub fn source(&self) -> ClientSource {
        self.source.clone()
    }

    #[must_use]
    pub fn observer(&self) -> &Observer<V> {
        &self.observer
    }

    #[must_use]
    pub fn options(&self) -> ObserveOptions {
        self.options
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn last_version(&self) -> Version {
        self.last_version
    }

    pub fn mark_delivered(&mut self, version: Version) {
        self.last_version = version;
    }

    #[must_use]
    pub fn listener(&self) -> Option<ListenerId> {
        self.listener
    }

    pub fn set_listener(&mut self, listener: Option<ListenerId>) {
        self.listener = listener;
    }

    #[must_use]
    pub fn resume_key(&self) -> Option<&str> {
        self.resume_key.as_deref()
    }
}

impl<V> std::fmt::Debug for ClientDelegate<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientDelegate")
            .field("observer", &self.observer.id())
            .field("source", &self.source)
            .field("active", &self.active)
            .field("last_version", &self.last_version)
            .field("thread_mode", &self.options.thread_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecell_core::LifecycleState;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;

    struct StubOwner {
        state: Mutex<LifecycleState>,
        listeners: Mutex<BTreeMap<ListenerId, LifecycleListener>>,
    }

    impl StubOwner {
        fn new(state: LifecycleState) -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(state),
                listeners: Mutex::new(BTreeMap::new()),
            })
        }
    }

    impl LifecycleOwner for StubOwner {
        fn current_state(&self) -> LifecycleState {
            *self.state.lock()
        }
        fn add_listener(&self, listener: LifecycleListener) -> ListenerId {
            let mut listeners = self.listeners.lock();
            let id = ListenerId(listeners.len() as u64 + 1);
            listeners.insert(id, listener);
            id
        }
        fn remove_listener(&self, id: ListenerId) {
            self.listeners.lock().remove(&id);
        }
        fn name(&self) -> &str {
            "stub"
        }
    }

    fn observer() -> Observer<u32> {
        Observer::new(|_| {})
    }

    #[test]
    fn set_active_reports_only_real_changes() {
        let mut d = ClientDelegate::always_active(ObserveOptions::new(), observer());
        assert!(!d.is_active());
        assert!(d.set_active(true));
        assert!(!d.set_active(true));
        assert!(d.set_active(false));
        assert!(!d.set_active(false));
    }

    #[test]
    fn fresh_delegate_never_delivered() {
        let d = ClientDelegate::always_active(ObserveOptions::new(), observer());
        assert_eq!(d.last_version(), NEVER_DELIVERED);
        assert_eq!(d.resume_key(), None);
    }

    #[test]
    fn resuming_restores_version() {
        let d = ClientDelegate::always_active(ObserveOptions::new(), observer())
            .resuming("k".into(), 4);
        assert_eq!(d.last_version(), 4);
        assert_eq!(d.resume_key(), Some("k"));
    }

    #[test]
    fn always_active_is_never_associated() {
        let owner: Arc<dyn LifecycleOwner> = StubOwner::new(LifecycleState::Started);
        let d = ClientDelegate::always_active(ObserveOptions::new(), observer());
        assert!(!d.associated_with(&owner));
        assert!(d.source().is_currently_eligible());
        assert_eq!(d.source().observe_source(Arc::new(|_| {})), None);
        assert!(!d.is_lifecycle_bound());
    }

    #[test]
    fn lifecycle_eligibility_follows_owner_state() {
        let stub = StubOwner::new(LifecycleState::Created);
        let owner: Arc<dyn LifecycleOwner> = stub.clone();
        let d = ClientDelegate::lifecycle(Arc::clone(&owner), ObserveOptions::new(), observer());
        assert!(d.associated_with(&owner));
        assert!(!d.source().is_currently_eligible());
        *stub.state.lock() = LifecycleState::Resumed;
        assert!(d.source().is_currently_eligible());
        assert_eq!(d.source().name(), "stub");
    }

    #[test]
    fn lifecycle_source_registers_and_removes_listener() {
        let stub = StubOwner::new(LifecycleState::Started);
        let owner: Arc<dyn LifecycleOwner> = stub.clone();
        let source = ClientSource::Lifecycle(owner);
        let id = source.observe_source(Arc::new(|_| {}));
        assert!(id.is_some());
        assert_eq!(stub.listeners.lock().len(), 1);
        source.stop_observing(id);
        assert!(stub.listeners.lock().is_empty());
    }
}
