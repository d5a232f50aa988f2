#![forbid(unsafe_code)]

//! Lifecycle-aware latest-value holder.
//!
//! # Design
//!
//! [`LiveData<V>`] is a cloneable handle to shared state split across two
//! locks:
//!
//! - the **cell** (value + version), which producers on any thread may read;
//! - the **engine** (registry, dispatch state, aggregator, ledger), which is
//!   only driven from the executor thread and so is uncontended in practice.
//!
//! No lock is ever held while user code runs. Observers, hooks and lifecycle
//! owners may therefore call straight back into the holder: a nested
//! `set_now` marks the running sweep for restart instead of recursing, and a
//! nested active-state flip is folded into the outermost aggregator loop.
//!
//! # Delivery gate
//!
//! A delegate receives the current value only if, in order:
//!
//! 1. the cell holds a value;
//! 2. its last delivered version differs from the cell's version;
//! 3. its cached active flag is set;
//! 4. its source confirms it is still eligible (otherwise the flag is
//!    corrected and delivery skipped).
//!
//! # Failure Modes
//!
//! - **Off-executor mutation**: with strict thread checks enabled, calling an
//!   executor-only operation from another thread panics.
//! - **Owner conflict**: registering one observer under two owners panics
//!   (or returns `Err` from the `try_*` variants).
//! - **Asynchronous owners**: the lifecycle stabilisation loop assumes an
//!   owner's state changes are visible synchronously.

use std::fmt;
use std::sync::{Arc, Weak};
use std::thread;

use livecell_core::{Executor, LifecycleListener, LifecycleOwner};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::aggregator::{ActiveCountAggregator, ActivityEdge, ReduceStep};
use super::cell::{PendingSlot, Version, VersionedCell};
use super::delegate::{ClientDelegate, ClientSource};
use super::dispatch::{DispatchState, DispatchTarget};
use super::ledger::VersionLedger;
use super::observer::{Observer, ObserverId};
use super::options::{ObserveOptions, ThreadMode};
use super::registry::{Cursor, ObserverRegistry};
use crate::config::LiveDataConfig;
use crate::error::LiveDataError;

type Hook<V> = Arc<dyn Fn(&LiveData<V>) + Send + Sync>;

struct Engine<V> {
    registry: ObserverRegistry<ObserverId, ClientDelegate<V>>,
    dispatch: DispatchState,
    aggregator: ActiveCountAggregator,
    ledger: VersionLedger,
}

struct Shared<V> {
    executor: Arc<dyn Executor>,
    config: LiveDataConfig,
    cell: Mutex<VersionedCell<V>>,
    pending: PendingSlot<V>,
    engine: Mutex<Engine<V>>,
    on_active: Option<Hook<V>>,
    on_inactive: Option<Hook<V>>,
}

/// A shared, versioned latest value dispatched to lifecycle-gated observers.
///
/// Cloning a `LiveData` creates a new handle to the **same** state.
///
/// # Invariants
///
/// 1. `read_version()` increases by exactly 1 per committed `set_now`.
/// 2. An observer sees each version at most once.
/// 3. Dispatch never recurses; nested updates restart the running sweep.
/// 4. At quiescence the active count equals the number of active delegates.
pub struct LiveData<V> {
    shared: Arc<Shared<V>>,
}

impl<V> Clone for LiveData<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for LiveData<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (value, version) = {
            let cell = self.shared.cell.lock();
            (format!("{:?}", cell.value()), cell.version())
        };
        let (observers, active) = {
            let engine = self.shared.engine.lock();
            (engine.registry.len(), engine.aggregator.count())
        };
        f.debug_struct("LiveData")
            .field("value", &value)
            .field("version", &version)
            .field("observer_count", &observers)
            .field("active_count", &active)
            .finish()
    }
}

/// Builder for [`LiveData`].
pub struct LiveDataBuilder<V> {
    executor: Arc<dyn Executor>,
    initial: Option<V>,
    config: LiveDataConfig,
    on_active: Option<Hook<V>>,
    on_inactive: Option<Hook<V>>,
}

impl<V: Clone + Send + 'static> LiveDataBuilder<V> {
    /// Start with `value` at [`START_VERSION`](super::START_VERSION).
    #[must_use]
    pub fn initial(mut self, value: V) -> Self {
        self.initial = Some(value);
        self
    }

    #[must_use]
    pub fn config(mut self, config: LiveDataConfig) -> Self {
        self.config = config;
        self
    }

    /// Called when the number of active observers goes from 0 to positive.
    #[must_use]
    pub fn on_active(mut self, hook: impl Fn(&LiveData<V>) + Send + Sync + 'static) -> Self {
        self.on_active = Some(Arc::new(hook));
        self
    }

    /// Called when the number of active observers drops back to 0.
    ///
    /// Inactive observers may still be registered; see
    /// [`LiveData::has_observers`].
    #[must_use]
    pub fn on_inactive(mut self, hook: impl Fn(&LiveData<V>) + Send + Sync + 'static) -> Self {
        self.on_inactive = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn build(self) -> LiveData<V> {
        let cell = match self.initial {
            Some(value) => VersionedCell::with_value(value),
            None => VersionedCell::empty(),
        };
        LiveData {
            shared: Arc::new(Shared {
                executor: self.executor,
                config: self.config,
                cell: Mutex::new(cell),
                pending: PendingSlot::new(),
                engine: Mutex::new(Engine {
                    registry: ObserverRegistry::new(),
                    dispatch: DispatchState::default(),
                    aggregator: ActiveCountAggregator::new(),
                    ledger: VersionLedger::new(),
                }),
                on_active: self.on_active,
                on_inactive: self.on_inactive,
            }),
        }
    }
}

/// Resets the dispatch state if a sweep unwinds.
struct DispatchGuard<'a, V> {
    live: &'a LiveData<V>,
}

impl<V> Drop for DispatchGuard<'_, V> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.live.shared.engine.lock().dispatch.reset();
        }
    }
}

/// Clears the aggregator's reducing flag if a hook unwinds.
struct ReduceGuard<'a, V> {
    live: &'a LiveData<V>,
}

impl<V> Drop for ReduceGuard<'_, V> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.live.shared.engine.lock().aggregator.abort();
        }
    }
}

impl<V: Clone + Send + 'static> LiveData<V> {
    /// Start building a holder bound to `executor`.
    #[must_use]
    pub fn builder(executor: Arc<dyn Executor>) -> LiveDataBuilder<V> {
        LiveDataBuilder {
            executor,
            initial: None,
            config: LiveDataConfig::default(),
            on_active: None,
            on_inactive: None,
        }
    }

    /// An unset holder with default configuration.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self::builder(executor).build()
    }

    /// A holder starting with `value`.
    #[must_use]
    pub fn with_value(executor: Arc<dyn Executor>, value: V) -> Self {
        Self::builder(executor).initial(value).build()
    }

    // ── Registration ──────────────────────────────────────────────────────

    /// Observe while `owner` is at least started.
    ///
    /// Returns `false` if the call was ignored: the owner is already
    /// destroyed, or the observer is already registered with this owner.
    ///
    /// # Panics
    ///
    /// Panics if the observer is registered with a different owner, or (in
    /// strict mode) when called off the executor.
    pub fn observe(&self, owner: &Arc<dyn LifecycleOwner>, observer: &Observer<V>) -> bool {
        self.try_observe(owner, observer).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Fallible form of [`observe`](Self::observe).
    pub fn try_observe(
        &self,
        owner: &Arc<dyn LifecycleOwner>,
        observer: &Observer<V>,
    ) -> Result<bool, LiveDataError> {
        self.check_on_executor("observe")?;
        self.register_bound(owner, ObserveOptions::default(), observer, None)
    }

    /// [`observe`](Self::observe) with explicit options.
    pub fn observe_with(
        &self,
        owner: &Arc<dyn LifecycleOwner>,
        options: ObserveOptions,
        observer: &Observer<V>,
    ) -> bool {
        self.check_on_executor("observe")
            .and_then(|()| self.register_bound(owner, options, observer, None))
            .unwrap_or_else(|err| panic!("{err}"))
    }

    /// Observe while `owner` is started, resuming from the version last
    /// recorded under `key`.
    ///
    /// When the observer is removed (explicitly or because its owner was
    /// destroyed) its last delivered version is recorded under `key`, so a
    /// replacement owner observing with the same key is not handed a value
    /// its predecessor already received.
    pub fn observe_keyed(
        &self,
        owner: &Arc<dyn LifecycleOwner>,
        key: impl Into<String>,
        observer: &Observer<V>,
    ) -> bool {
        self.check_on_executor("observe_keyed")
            .and_then(|()| {
                self.register_bound(owner, ObserveOptions::default(), observer, Some(key.into()))
            })
            .unwrap_or_else(|err| panic!("{err}"))
    }

    /// Observe until explicitly removed. The observer counts as active
    /// immediately and receives the current value, if any.
    ///
    /// # Panics
    ///
    /// Panics if the observer is already bound to a lifecycle owner, or (in
    /// strict mode) when called off the executor.
    pub fn observe_forever(&self, options: ObserveOptions, observer: &Observer<V>) -> bool {
        self.try_observe_forever(options, observer)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    /// Fallible form of [`observe_forever`](Self::observe_forever).
    pub fn try_observe_forever(
        &self,
        options: ObserveOptions,
        observer: &Observer<V>,
    ) -> Result<bool, LiveDataError> {
        self.check_on_executor("observe_forever")?;
        let id = observer.id();
        {
            let mut engine = self.shared.engine.lock();
            let delegate = ClientDelegate::always_active(options, observer.clone());
            if let Some(existing) = engine.registry.put_if_absent(id, delegate) {
                if existing.is_lifecycle_bound() {
                    return Err(LiveDataError::OwnerConflict { observer: id });
                }
                warn!(observer = %id, "ignoring duplicate observe_forever");
                return Ok(false);
            }
        }
        debug!(observer = %id, thread_mode = %options.thread_mode, "observer registered forever");
        self.change_active_state(id, true);
        Ok(true)
    }

    /// Remove `observer`. Returns `true` if it was registered.
    pub fn remove_observer(&self, observer: &Observer<V>) -> bool {
        self.remove_observer_by_id(observer.id())
    }

    /// Remove the observer with identity `id`. Returns `true` if it was
    /// registered.
    pub fn remove_observer_by_id(&self, id: ObserverId) -> bool {
        self.ensure_on_executor("remove_observer");
        let removed = self.shared.engine.lock().registry.remove(&id);
        match removed {
            Some(delegate) => {
                self.on_observer_removed(id, delegate);
                true
            }
            None => false,
        }
    }

    /// Remove every observer bound to `owner`. Forever observers are kept.
    pub fn remove_observers_for(&self, owner: &Arc<dyn LifecycleOwner>) -> usize {
        self.ensure_on_executor("remove_observers_for");
        let ids = self
            .shared
            .engine
            .lock()
            .registry
            .keys_where(|d| d.associated_with(owner));
        let mut removed = 0;
        for id in ids {
            if self.remove_observer_by_id(id) {
                removed += 1;
            }
        }
        removed
    }

    /// Drop the version remembered under `key`, so the next observer keyed
    /// with it starts fresh and receives the current value. Returns `true`
    /// if a version was remembered.
    ///
    /// Observers currently registered under `key` keep their own version and
    /// record it again when removed.
    pub fn forget_key(&self, key: &str) -> bool {
        self.ensure_on_executor("forget_key");
        let forgotten = self.shared.engine.lock().ledger.forget(key);
        if let Some(version) = forgotten {
            debug!(key, version, "forgot keyed version");
        }
        forgotten.is_some()
    }

    // ── Publishing ────────────────────────────────────────────────────────

    /// Commit `value` and dispatch it to every eligible observer.
    ///
    /// The version is bumped even if `value` equals the current one.
    ///
    /// # Panics
    ///
    /// In strict mode, panics when called off the executor.
    pub fn set_now(&self, value: V) {
        self.ensure_on_executor("set_now");
        self.commit(value);
    }

    /// Post `value` from any thread.
    ///
    /// Only the last value posted before the executor drains the slot is
    /// committed; earlier ones are dropped.
    pub fn set_later(&self, value: V) {
        if self.shared.pending.post(value) {
            let live = self.clone();
            self.shared
                .executor
                .execute(Box::new(move || live.drain_pending()));
        }
    }

    /// Publish honoring observers' [`ThreadMode`].
    ///
    /// On the executor this is [`set_now`](Self::set_now). Elsewhere it
    /// commits synchronously if any registered observer asked for
    /// [`ThreadMode::Poster`], and posts through [`set_later`](Self::set_later)
    /// otherwise.
    ///
    /// # Threading
    ///
    /// The thread mode selects the path for the whole holder, not per
    /// observer. Once a `Poster` observer is registered, an off-executor
    /// `send` also runs [`ThreadMode::Main`] observers on the calling thread.
    /// If a sweep is already running on another thread, the commit only
    /// schedules a restart of that sweep, and every observer (the `Poster`
    /// ones included) is then served from the thread running it.
    /// Strict thread checks do not apply on this path.
    pub fn send(&self, value: V) {
        if self.shared.executor.is_current() {
            self.commit(value);
            return;
        }
        let wants_poster = self
            .shared
            .engine
            .lock()
            .registry
            .iter()
            .any(|(_, d)| d.options().thread_mode == ThreadMode::Poster);
        if wants_poster {
            self.commit(value);
        } else {
            self.set_later(value);
        }
    }

    /// Clear the value without touching the version. Nothing is dispatched
    /// until a new value is set.
    pub fn unset(&self) {
        self.ensure_on_executor("unset");
        self.shared.cell.lock().unset();
    }

    // ── Introspection ─────────────────────────────────────────────────────

    /// The current value. Off the executor this may be stale.
    #[must_use]
    pub fn read_value(&self) -> Option<V> {
        self.shared.cell.lock().value().cloned()
    }

    /// Number of committed changes, offset by the starting version.
    #[must_use]
    pub fn read_version(&self) -> Version {
        self.shared.cell.lock().version()
    }

    #[must_use]
    pub fn has_observers(&self) -> bool {
        !self.shared.engine.lock().registry.is_empty()
    }

    #[must_use]
    pub fn has_active_observers(&self) -> bool {
        self.active_observer_count() > 0
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.shared.engine.lock().registry.len()
    }

    #[must_use]
    pub fn active_observer_count(&self) -> usize {
        self.shared.engine.lock().aggregator.count()
    }

    /// Version last delivered to `observer`, if it is registered.
    #[must_use]
    pub fn delivered_version(&self, observer: &Observer<V>) -> Option<Version> {
        self.shared
            .engine
            .lock()
            .registry
            .get(&observer.id())
            .map(ClientDelegate::last_version)
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn check_on_executor(&self, operation: &'static str) -> Result<(), LiveDataError> {
        if self.shared.config.strict_thread_checks && !self.shared.executor.is_current() {
            return Err(LiveDataError::OffExecutor { operation });
        }
        Ok(())
    }

    fn ensure_on_executor(&self, operation: &'static str) {
        if let Err(err) = self.check_on_executor(operation) {
            panic!("{err}");
        }
    }

    fn commit(&self, value: V) {
        let version = self.shared.cell.lock().commit(value);
        trace!(version, "value committed");
        self.dispatch(DispatchTarget::All);
    }

    fn drain_pending(&self) {
        if let Some(value) = self.shared.pending.take() {
            self.set_now(value);
        }
    }

    fn register_bound(
        &self,
        owner: &Arc<dyn LifecycleOwner>,
        options: ObserveOptions,
        observer: &Observer<V>,
        resume_key: Option<String>,
    ) -> Result<bool, LiveDataError> {
        if owner.current_state().is_destroyed() {
            warn!(owner = owner.name(), "ignoring observe on a destroyed owner");
            return Ok(false);
        }
        let id = observer.id();
        {
            let mut engine = self.shared.engine.lock();
            let mut delegate =
                ClientDelegate::lifecycle(Arc::clone(owner), options, observer.clone());
            if let Some(key) = resume_key {
                let version = engine.ledger.recall(&key);
                delegate = delegate.resuming(key, version);
            }
            if let Some(existing) = engine.registry.put_if_absent(id, delegate) {
                if !existing.associated_with(owner) {
                    return Err(LiveDataError::OwnerConflict { observer: id });
                }
                warn!(observer = %id, owner = owner.name(), "ignoring duplicate observe");
                return Ok(false);
            }
        }
        debug!(observer = %id, owner = owner.name(), "observer registered");
        self.start_observing(id);
        Ok(true)
    }

    /// Hook the delegate up to its owner and sync it to the current state.
    fn start_observing(&self, id: ObserverId) {
        let Some(source) = self.source_of(id) else {
            return;
        };
        let weak: Weak<Shared<V>> = Arc::downgrade(&self.shared);
        let listener: LifecycleListener = Arc::new(move |_state| {
            if let Some(shared) = weak.upgrade() {
                LiveData { shared }.on_owner_state_changed(id);
            }
        });
        let Some(listener_id) = source.observe_source(listener) else {
            return;
        };
        let stored = match self.shared.engine.lock().registry.get_mut(&id) {
            Some(delegate) => {
                delegate.set_listener(Some(listener_id));
                true
            }
            None => false,
        };
        if !stored {
            // Removed while registering (owner destroyed synchronously).
            source.stop_observing(Some(listener_id));
            return;
        }
        self.on_owner_state_changed(id);
    }

    fn source_of(&self, id: ObserverId) -> Option<ClientSource> {
        self.shared
            .engine
            .lock()
            .registry
            .get(&id)
            .map(ClientDelegate::source)
    }

    /// Lifecycle notification for the delegate `id`.
    ///
    /// Re-reads the owner after each evaluation so that a transition made by
    /// an observer or hook during the evaluation is surfaced on its own.
    fn on_owner_state_changed(&self, id: ObserverId) {
        let Some(ClientSource::Lifecycle(owner)) = self.source_of(id) else {
            return;
        };
        let mut state = owner.current_state();
        if state.is_destroyed() {
            debug!(observer = %id, owner = owner.name(), "owner destroyed; removing observer");
            self.remove_observer_by_id(id);
            return;
        }
        let mut prev = None;
        while prev != Some(state) {
            prev = Some(state);
            self.change_active_state(id, state.is_active());
            state = owner.current_state();
        }
    }

    /// The single entry point for active-flag changes.
    fn change_active_state(&self, id: ObserverId, active: bool) {
        let changed = self
            .shared
            .engine
            .lock()
            .registry
            .get_mut(&id)
            .is_some_and(|d| d.set_active(active));
        if changed {
            self.on_active_state_changed(id, active);
        }
    }

    fn on_active_state_changed(&self, id: ObserverId, active: bool) {
        self.update_active_count(active);
        if active {
            self.dispatch(DispatchTarget::One(id));
        }
    }

    fn update_active_count(&self, active: bool) {
        let Some(mut prev) = self.shared.engine.lock().aggregator.apply(active) else {
            return;
        };
        let _guard = ReduceGuard { live: self };
        loop {
            let step = self.shared.engine.lock().aggregator.step(&mut prev);
            match step {
                ReduceStep::Converged => break,
                ReduceStep::Quiet => {}
                ReduceStep::Fire(edge) => self.run_hook(edge),
            }
        }
    }

    fn run_hook(&self, edge: ActivityEdge) {
        debug!(?edge, "active observer count crossed zero");
        let hook = match edge {
            ActivityEdge::BecameUsed => self.shared.on_active.as_ref(),
            ActivityEdge::BecameUnused => self.shared.on_inactive.as_ref(),
        };
        if let Some(hook) = hook {
            hook(self);
        }
    }

    fn on_observer_removed(&self, id: ObserverId, mut delegate: ClientDelegate<V>) {
        delegate.source().stop_observing(delegate.listener());
        if let Some(key) = delegate.resume_key() {
            self.shared
                .engine
                .lock()
                .ledger
                .record(key, delegate.last_version());
        }
        if delegate.set_active(false) {
            self.on_active_state_changed(id, false);
        }
        debug!(observer = %id, "observer removed");
    }

    fn dispatch(&self, target: DispatchTarget) {
        if !self.shared.engine.lock().dispatch.begin() {
            trace!(?target, "dispatch requested mid-sweep; restart scheduled");
            return;
        }
        let _guard = DispatchGuard { live: self };
        let mut target = target;
        loop {
            match target {
                DispatchTarget::One(id) => self.attempt_notify(id),
                DispatchTarget::All => {
                    let mut cursor = Cursor::new();
                    loop {
                        let next = {
                            let engine = self.shared.engine.lock();
                            if engine.dispatch.restart_pending() {
                                None
                            } else {
                                cursor.next(&engine.registry)
                            }
                        };
                        let Some(id) = next else {
                            break;
                        };
                        self.attempt_notify(id);
                    }
                }
            }
            if self.shared.engine.lock().dispatch.finish_sweep() {
                break;
            }
            trace!("restarting dispatch sweep");
            target = DispatchTarget::All;
        }
    }

    fn attempt_notify(&self, id: ObserverId) {
        let version = {
            let cell = self.shared.cell.lock();
            if !cell.is_set() {
                return;
            }
            cell.version()
        };
        let source = {
            let engine = self.shared.engine.lock();
            let Some(delegate) = engine.registry.get(&id) else {
                return;
            };
            if delegate.last_version() == version || !delegate.is_active() {
                return;
            }
            delegate.source()
        };
        if !source.is_currently_eligible() {
            warn!(
                observer = %id,
                owner = %source.name(),
                "skipping delivery: cached active flag is stale"
            );
            self.change_active_state(id, false);
            return;
        }
        let value = {
            let cell = self.shared.cell.lock();
            match cell.value() {
                Some(value) if cell.version() == version => value.clone(),
                // Changed underneath us; the pending restart delivers it.
                _ => return,
            }
        };
        let observer = {
            let mut engine = self.shared.engine.lock();
            let Some(delegate) = engine.registry.get_mut(&id) else {
                return;
            };
            delegate.mark_delivered(version);
            delegate.observer().clone()
        };
        if self.shared.config.trace_deliveries {
            trace!(observer = %id, version, "delivering value");
        }
        observer.notify(&value);
    }
}
